use std::io::{BufRead, BufReader};
use symbolic_derivative::{Config, Derivation};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::default();
    let stdin = std::io::stdin();
    let mut previous: Option<Derivation> = None;

    println!("Enter f(x), or an empty line to differentiate again");

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;

        let got = match (line.trim(), &previous) {
            ("", Some(previous)) => previous.next(&config),
            ("", None) => continue,
            (text, _) => symbolic_derivative::differentiate(text, &config),
        };

        match got {
            Ok(derivation) => {
                println!("{}", derivation);
                previous = Some(derivation);
            },
            Err(e) => eprintln!("Unable to differentiate \"{}\": {}", line, e),
        }
    }

    Ok(())
}
