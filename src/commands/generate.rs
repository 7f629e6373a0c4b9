//! Generate command implementation.
//!
//! Writes a single worker input file.

use std::path::Path;

use herakles_memwatch::generate::generate_binary_file;

/// Generates one filler file of `size_mb` megabytes.
pub fn command_generate(output: &Path, size_mb: u64) -> Result<(), Box<dyn std::error::Error>> {
    generate_binary_file(output, size_mb)?;
    println!("✅ Generated {} ({} MB)", output.display(), size_mb);
    Ok(())
}
