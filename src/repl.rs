use crate::config::InterpreterConfig;
use crate::framebuffer::PixelBuffer;
use crate::runner;
use std::io::{self, Write};

/// Interactive preview. Every line is a complete script drawn on top of the
/// last successful frame, so a picture can be built up one call at a time.
pub fn start(config: &InterpreterConfig, seed: Option<PixelBuffer>) {
    println!("oledsim v{}", env!("CARGO_PKG_VERSION"));
    println!("Enter statements to draw. 'show' prints the screen, 'reset' clears it,");
    println!("'exit' or Ctrl+D quits.");
    println!();

    let mut pixels = seed.unwrap_or_default();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                match line {
                    "" => continue,
                    "exit" | "quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "show" => print!("{}", pixels.to_ascii()),
                    "reset" => {
                        pixels = PixelBuffer::new();
                        println!("Screen cleared.");
                    }
                    source => {
                        if let Some(next) = runner::run(source, None, Some(&pixels), config) {
                            let changed = changed_pixels(&pixels, &next);
                            pixels = next;
                            println!("ok ({} pixels changed, {} lit)", changed, pixels.count_set());
                        }
                    }
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn changed_pixels(before: &PixelBuffer, after: &PixelBuffer) -> usize {
    before
        .as_bytes()
        .iter()
        .zip(after.as_bytes())
        .map(|(a, b)| (a ^ b).count_ones() as usize)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_flipped_bits() {
        let before = PixelBuffer::new();
        let mut after = PixelBuffer::new();
        after.set(0, 0, true);
        after.set(5, 5, true);
        assert_eq!(changed_pixels(&before, &after), 2);
        assert_eq!(changed_pixels(&after, &after), 0);
    }
}
