//! Audio output device listing.

use hiss_io::output_device_names;

pub fn run() -> anyhow::Result<()> {
    let names = output_device_names()?;

    if names.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("Output Devices");
    println!("==============\n");
    for (idx, name) in names.iter().enumerate() {
        println!("  [{}] {}", idx, name);
    }
    println!();
    println!("Use 'hiss play --device <name>' to select one.");
    Ok(())
}
