//! Test command implementation.
//!
//! Prints the debug flag and the action vocabulary with its numeric values.

use blkflux::{Action, CategorySet, NotifySubtype};

use crate::config::Config;

/// Prints the category flags and subtype codes the decoder knows about.
pub fn command_test(config: &Config) -> anyhow::Result<()> {
    println!("🧪 blkflux - Test Mode");
    println!("======================");
    println!("debug={}", config.debug.unwrap_or(false));
    println!(
        "{} = {:#010x}",
        CategorySet::NOTIFY,
        CategorySet::NOTIFY.bits()
    );

    println!("\n📋 Categories:");
    for (name, flag) in CategorySet::all().iter_names() {
        println!("   ├─ {:<10} {:#010x}", name, flag.bits());
    }

    println!("\n📋 Actions:");
    for action in Action::ALL {
        println!("   ├─ {:<12} {:>3}", action.name(), action.code());
    }

    println!("\n📋 Notify subtypes:");
    for subtype in [
        NotifySubtype::Process,
        NotifySubtype::Timestamp,
        NotifySubtype::Message,
    ] {
        println!("   ├─ {:<12} {:>3}", subtype.name(), subtype.code());
    }

    Ok(())
}
