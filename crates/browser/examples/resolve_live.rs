//! Live example - resolving descriptors in a running Chrome

use browser::{CdpConfig, CdpPage, ElementResolver};
use browser::BrowserSession;
use selector::{AttributeKind, SelectorDescriptor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Connect to Chrome
    let config = CdpConfig::with_endpoint("ws://localhost:9222/devtools/browser");
    println!("Connecting to Chrome at: {}", config.endpoint);

    let page = CdpPage::connect(&config).await?;
    println!("Connected!");

    page.navigate("https://www.rust-lang.org").await?;

    let resolver = ElementResolver::default();

    // Structural lookup
    let links = resolver
        .resolve_all(&SelectorDescriptor::tag_only("a"), &page)
        .await?;
    println!("{} links on the page", links.len());

    // Text lookup
    let install = resolver
        .resolve(
            &SelectorDescriptor::new("a", AttributeKind::InnerTextContains, "Install"),
            &page,
        )
        .await?;
    println!("Install link: {:?}", page.get_attribute(&install, "href").await?);

    // Any-attribute lookup needs scripting, which CDP provides
    let exists = resolver
        .exists(
            &SelectorDescriptor::new("a", AttributeKind::AttributeTextContains, "github"),
            &page,
        )
        .await?;
    println!("Links to GitHub: {}", exists);

    // Clean shutdown
    page.close().await?;
    println!("Disconnected");

    Ok(())
}
