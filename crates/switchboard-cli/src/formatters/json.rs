//! JSON formatter for command results.

use serde::Serialize;

pub fn print_json<T: Serialize>(result: &T) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}
