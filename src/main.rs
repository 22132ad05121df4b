fn main() -> anyhow::Result<()> {
    mailprefs::cli::run()
}
