/// Ordered list of records that the account and signature widgets mutate in place.
///
/// Records are matched by equality, which for the opaque JSON records stored here is
/// identity: two distinct accounts never serialize the same.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListEditor<T> {
    items: Vec<T>,
}

impl<T: PartialEq> ListEditor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn position(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn remove(&mut self, item: &T) -> Option<T> {
        let index = self.position(item)?;
        Some(self.items.remove(index))
    }

    pub fn update(&mut self, item: &T, replacement: T) -> bool {
        match self.position(item) {
            Some(index) => {
                self.items[index] = replacement;
                true
            }
            None => false,
        }
    }

    /// Moves the record at `from` so it ends up at `to`. Out-of-range targets are
    /// clamped to the end; an out-of-range source is ignored.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        let to = to.min(self.items.len());
        self.items.insert(to, item);
        from != to
    }
}
