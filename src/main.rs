fn main() {
    if let Err(e) = voronoi_compute::core::App::run() {
        eprintln!("Voronoi demo failed: {}", e);
        std::process::exit(1);
    }
}
