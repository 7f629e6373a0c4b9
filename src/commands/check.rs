//! Check command implementation.
//!
//! Validates system requirements and configuration.

use nix::sys::signal::Signal;

use herakles_memwatch::config::{validate_effective_config, Config};
use herakles_memwatch::event_log::EventLog;
use herakles_memwatch::notify::NotificationKind;
use herakles_memwatch::process::{MemoryProbe, ProcStatusProbe};

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles Memory Watch - System Check");
    println!("=======================================");

    let mut all_ok = true;

    println!("\n💾 Checking memory probe...");
    let probe = ProcStatusProbe::current();
    match probe.resident_kb() {
        Ok(rss_kb) => {
            println!(
                "   ✅ {} readable: RSS={} KB (threshold {} KB)",
                probe.status_path().display(),
                rss_kb,
                config.threshold_kb()
            );
            if rss_kb > config.threshold_kb() {
                println!("   ⚠️  Baseline RSS already above threshold - every worker will report");
            }
        }
        Err(e) => {
            println!("   ❌ Memory probe failed: {}", e);
            all_ok = false;
        }
    }

    println!("\n📝 Checking event log...");
    let log = EventLog::new(config.log_file());
    match log.probe_writable() {
        Ok(()) => println!("   ✅ {} is appendable and lockable", log.path().display()),
        Err(e) => {
            println!("   ❌ {}: {}", log.path().display(), e);
            all_ok = false;
        }
    }

    println!("\n📡 Notification signals...");
    for kind in NotificationKind::ALL {
        let signal: Signal = kind.signal();
        println!("   ✅ {} -> {}", kind, signal.as_str());
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
