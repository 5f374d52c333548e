fn main() -> Result<(), Box<dyn std::error::Error>> {
    catalog_query::run()
}
