fn main() -> anyhow::Result<()> {
    tcg_cli::run()
}
