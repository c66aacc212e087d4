use rust_ev_sim::simulation::controller;

fn main() {
    if let Err(e) = controller::run_from_args() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
