fn main() -> Result<(), Box<dyn std::error::Error>> {
    maw_cli::main(std::env::args().collect())
}
