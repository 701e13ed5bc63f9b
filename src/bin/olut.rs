// Copyright (c) 2017-2025 ETH Zurich
// Fabian Schuiki <fschuiki@iis.ee.ethz.ch>

fn main() {
    if let Err(e) = olut::cli::main() {
        eprintln!("{} {}", olut::error::Severity::Error, e);
        std::process::exit(1);
    }
}
