use anyhow::Result;

fn main() -> Result<()> {
    sheet_merge::cli::run()
}
