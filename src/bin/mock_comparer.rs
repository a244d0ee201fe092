//! Reference comparer for integration testing
//!
//! `mock_comparer <image1> <image2>` exits 0 and prints "Images are same"
//! for identical pixels, exits 2 naming the first differing pixel, and
//! exits 1 when either image is unreadable or the dimensions disagree.

use std::path::Path;
use std::process::ExitCode;

use conformance::bmp::Bitmap;

const RC_TOTALLY_DIFFERENT: u8 = 1;
const RC_DIFFERENT: u8 = 2;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [first, second] = args.as_slice() else {
        eprintln!("Error: Expected exactly two image paths.");
        return ExitCode::from(RC_TOTALLY_DIFFERENT);
    };

    let read = |path: &str| {
        Bitmap::read(Path::new(path)).map_err(|e| eprintln!("Error: Unable to read {path}: {e}"))
    };
    let (Ok(image1), Ok(image2)) = (read(first.as_str()), read(second.as_str())) else {
        return ExitCode::from(RC_TOTALLY_DIFFERENT);
    };

    if !image1.same_format(&image2) {
        eprintln!(
            "Error: Images have different dimensions ({}x{} vs {}x{}).",
            image1.width(),
            image1.height(),
            image2.width(),
            image2.height()
        );
        return ExitCode::from(RC_TOTALLY_DIFFERENT);
    }

    match image1.first_difference(&image2) {
        Some((x, y)) => {
            eprintln!("Images differ at pixel ({x}, {y})");
            ExitCode::from(RC_DIFFERENT)
        }
        None => {
            println!("Images are same");
            ExitCode::SUCCESS
        }
    }
}
