//! 8217 Scale Probe
//!
//! A standalone tool to check serial communication with an 8217 scale.
//! Sends a number of `W` requests and prints each raw frame and its decoding.
//!
//! Usage:
//!   cargo run --example scale_probe -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: /dev/ttyS0)
//!   --baud RATE       Baud rate (default: 9600)
//!   --count N         Number of requests (default: 10)
//!   --interval MS     Delay between requests in ms (default: 200)

use scalelink_core::protocol::{
    open_port, parse_payload, read_frame, Connection, LineSettings, SerialLink, DEFAULT_BAUD_RATE,
    POLL_COMMAND,
};
use std::time::{Duration, Instant};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut port_name = "/dev/ttyS0".to_string();
    let mut baud_rate = DEFAULT_BAUD_RATE;
    let mut count = 10u32;
    let mut interval_ms = 200u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_name = args[i].clone();
                }
            }
            "--baud" | "-b" => {
                i += 1;
                if i < args.len() {
                    baud_rate = args[i].parse().unwrap_or(DEFAULT_BAUD_RATE);
                }
            }
            "--count" | "-n" => {
                i += 1;
                if i < args.len() {
                    count = args[i].parse().unwrap_or(10);
                }
            }
            "--interval" | "-i" => {
                i += 1;
                if i < args.len() {
                    interval_ms = args[i].parse().unwrap_or(200);
                }
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            arg if !arg.starts_with('-') => {
                port_name = arg.to_string();
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
            }
        }
        i += 1;
    }

    let settings = LineSettings::seven_even_one(port_name, baud_rate);
    println!("Configuration:");
    println!("  Port:       {}", settings.port_name);
    println!("  Baud rate:  {}", settings.baud_rate);
    println!("  Line:       7E1, {}ms read timeout", settings.timeout.as_millis());
    println!("  Requests:   {} every {}ms", count, interval_ms);
    println!();

    let port = match open_port(&settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to open port: {}", e);
            eprintln!("   Make sure the port exists and you have permission (dialout group)");
            return;
        }
    };
    let mut conn = Connection::new(Box::new(SerialLink::new(port)));

    let mut ok = 0;
    for n in 1..=count {
        let start = Instant::now();
        let result = conn
            .send(&[POLL_COMMAND])
            .and_then(|_| read_frame(&mut conn));

        match result {
            Ok(payload) => {
                let elapsed = start.elapsed().as_millis();
                match parse_payload(&payload) {
                    Ok(update) => {
                        ok += 1;
                        println!("#{:<3} {:>4}ms  {:02x?}  {:?}", n, elapsed, payload, update);
                    }
                    Err(e) => println!("#{:<3} {:>4}ms  {}", n, elapsed, e),
                }
            }
            Err(e) => println!("#{:<3} {}", n, e),
        }

        std::thread::sleep(Duration::from_millis(interval_ms));
    }

    println!();
    println!("{} of {} requests decoded", ok, count);
}

fn print_help() {
    println!("8217 Scale Probe");
    println!();
    println!("Usage: scale_probe [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  -p, --port PORT       Serial port (default: /dev/ttyS0)");
    println!("  -b, --baud RATE       Baud rate (default: 9600)");
    println!("  -n, --count N         Number of requests (default: 10)");
    println!("  -i, --interval MS     Delay between requests in ms (default: 200)");
    println!("  -h, --help            Show this help");
}
