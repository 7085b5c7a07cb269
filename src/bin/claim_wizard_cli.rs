use claim_wizard::cli::{output, run_cli};

fn main() {
    claim_wizard::init();
    if let Err(err) = run_cli() {
        output::error(format!("{}", err));
        std::process::exit(1);
    }
}
