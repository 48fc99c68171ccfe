//! Login autofill walkthrough.
//!
//! Demonstrates:
//! - Attaching an in-process sandboxed page to the coordinator
//! - One credential request per navigation
//! - Popup on focus, fill on pointer-down
//! - No popup after the fill
//!
//! Usage:
//!   cargo run --example login_autofill
//!   cargo run --example login_autofill -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use tabshell_autofill::{
    Credential, Error, Geometry, HostCoordinator, InputSpec, MemoryDocument, MemoryStore,
    PopupEvent, RecordingRenderer, Result, SandboxPage, Size, TabId, outbound_channel,
};

// ============================================================================
// Constants
// ============================================================================

const LOGIN_URL: &str = "https://example.com/login";
const SURFACE: Geometry = Geometry::new(80.0, 0.0, 1280.0, 720.0);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    let filter = if debug {
        "tabshell_autofill=debug"
    } else {
        "tabshell_autofill=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Login autofill ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    println!("[Setup] Creating coordinator and page...");

    let store = MemoryStore::with_credentials([Credential::new(
        "https://example.com",
        "a@x.com",
        "s3cr3t",
    )])?;
    let renderer = Arc::new(RecordingRenderer::new());

    let coordinator = HostCoordinator::builder()
        .store(Arc::new(store))
        .renderer(renderer.clone())
        .window_size(Size::new(1280.0, 800.0))
        .build()?;

    let mut document = MemoryDocument::new(LOGIN_URL);
    let form = document.add_form();
    let user = document.add_input(
        InputSpec::text()
            .name("user_email")
            .rect(Geometry::new(200.0, 500.0, 280.0, 32.0)),
        Some(form),
    );
    let password = document.add_input(
        InputSpec::password()
            .name("pw")
            .rect(Geometry::new(250.0, 500.0, 280.0, 32.0)),
        Some(form),
    );

    let (outbound, lines) = outbound_channel();
    let page = SandboxPage::new(
        document,
        outbound,
        coordinator.options().scanner,
        SURFACE,
    );

    let tab = TabId::new(1).ok_or_else(|| Error::config("tab id must be non-zero"))?;
    coordinator.attach_tab(tab, Arc::new(page.clone()), lines)?;
    println!("        ✓ Tab {tab} attached\n");

    // ========================================================================
    // Navigation
    // ========================================================================

    println!("[1] Navigating to {LOGIN_URL}...");
    coordinator.on_navigation_start(tab).await?;
    coordinator.on_navigation_committed(tab, LOGIN_URL).await?;
    page.set_ready();
    coordinator.on_content_loaded(tab).await?;
    sleep(Duration::from_millis(50)).await;

    if let Some(session) = coordinator.session(tab) {
        println!(
            "    ✓ Session {:?}, {} suggestion(s)",
            session.state(),
            session.suggestions().len()
        );
    }

    // ========================================================================
    // Focus
    // ========================================================================

    println!("\n[2] Focusing the password field...");
    page.focus(password);
    sleep(Duration::from_millis(50)).await;

    match renderer.last() {
        Some(PopupEvent::Rendered {
            placement, entries, ..
        }) => {
            println!(
                "    ✓ Popup at ({}, {}) {}x{}",
                placement.left, placement.top, placement.width, placement.height
            );
            for entry in &entries {
                println!("      - {} ({})", entry.username, entry.hostname);
            }
        }
        _ => println!("    ✗ No popup shown"),
    }

    // ========================================================================
    // Selection
    // ========================================================================

    println!("\n[3] Selecting the first suggestion...");
    let filled = coordinator.select_suggestion(tab, 0).await?;
    sleep(Duration::from_millis(50)).await;
    println!("    ✓ Filled: {filled}");

    page.read(|doc| {
        println!("      username = {:?}", doc.value(user));
        println!(
            "      password = {}",
            if doc.value(password).is_some() { "<set>" } else { "<empty>" }
        );
    });

    // ========================================================================
    // Refocus
    // ========================================================================

    println!("\n[4] Refocusing...");
    page.blur();
    page.focus(user);
    sleep(Duration::from_millis(300)).await;
    println!("    ✓ Popups rendered in total: {}", renderer.render_count());

    coordinator.shutdown().await;
    println!("\n=== Done ===");
    Ok(())
}
