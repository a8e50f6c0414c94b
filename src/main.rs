use std::process;

use linksame::app::run;
use linksame::cli::Args;

fn main() {
    let code = run(Args::parse_args());
    if code != 0 {
        process::exit(code);
    }
}
