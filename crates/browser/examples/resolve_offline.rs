//! Offline example - resolving descriptors against a markup snapshot

use browser::{DocumentSession, ElementResolver, ResolverConfig};
use browser::BrowserSession;
use selector::{AttributeKind, SelectorDescriptor, SelectorDescriptorSet};
use std::time::Duration;

const PAGE: &str = r#"
<form id="login">
    <label for="user">User</label>
    <input id="user" name="user" placeholder="Email address">
    <input name="password" type="password">
    <button type="submit">Sign in</button>
    <button type="reset">Clear</button>
</form>
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let session = DocumentSession::from_markup(PAGE);
    let resolver = ElementResolver::new(ResolverConfig::new(
        Duration::from_millis(200),
        Duration::from_millis(20),
    ));

    // Descriptor catalog for every button on the page
    let mut buttons = SelectorDescriptorSet::new("button");
    buttons.insert(SelectorDescriptor::named(
        "Submit",
        "",
        AttributeKind::Type,
        "submit",
    ))?;
    buttons.insert(SelectorDescriptor::named(
        "Clear",
        "",
        AttributeKind::InnerTextExact,
        "Clear",
    ))?;
    println!("Catalog:\n{}", buttons.to_json()?);

    for descriptor in &buttons {
        let element = resolver.resolve(descriptor, &session).await?;
        println!(
            "{} -> node {} ({:?})",
            descriptor.display_name(),
            element,
            session.get_text(&element).await?
        );
    }

    // Several inputs: pick by position instead of failing as ambiguous
    let input = SelectorDescriptor::tag_only("input");
    match resolver.resolve(&input, &session).await {
        Ok(_) => println!("Unexpected single input"),
        Err(e) => println!("resolve: {}", e),
    }
    let second = resolver.resolve_nth(&input, 1, &session).await?;
    println!(
        "Second input name: {:?}",
        session.get_attribute(&second, "name").await?
    );

    // Offline tree queries work without a session at all
    let tree = session.tree();
    let label = tree
        .first_tag(&SelectorDescriptor::new("label", AttributeKind::For, "user"))
        .map(|node| tree.to_text(node.node_id));
    println!("Label text: {:?}", label);

    Ok(())
}
