fn main() -> Result<(), Box<dyn std::error::Error>> {
    milonga::runtime::run()
}
