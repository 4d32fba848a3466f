pub mod table;
pub mod json;

use crate::model::{CodeStats, ScannedCode};
use crate::store::StoreHealth;

pub fn print_codes(codes: &[ScannedCode], json_output: bool) {
    if json_output {
        println!("{}", json::render(codes));
    } else {
        print!("{}", table::render_codes(codes));
    }
}

pub fn print_code(code: &ScannedCode, json_output: bool) {
    if json_output {
        println!("{}", json::render(code));
    } else {
        print!("{}", table::render_code(code));
    }
}

pub fn print_stats(stats: &CodeStats, json_output: bool) {
    if json_output {
        println!("{}", json::render(stats));
    } else {
        print!("{}", table::render_stats(stats));
    }
}

pub fn print_health(health: &StoreHealth, json_output: bool) {
    if json_output {
        println!("{}", json::render(health));
    } else {
        print!("{}", table::render_health(health));
    }
}
