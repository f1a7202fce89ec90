use dom_modify::{Document, Event, ModifyOptions, create, find};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let fx_html = r#"
	<!DOCTYPE html>
	<html>
	<head><title>Demo</title></head>
	<body>
		<main id="app"></main>
	</body>
	</html>
	"#;

	let doc = Document::parse(fx_html)?;

	let app = find(&doc, "#app", Some(&ModifyOptions::new().with_classes("ready")), None)?.ok_or("no #app")?;

	let button = create(
		&doc,
		"button",
		Some(
			&ModifyOptions::new()
				.with_text("Click me")
				.with_parent(&app)
				.with_style("fontWeight", "bold")
				.with_on("click", |ev, el| println!("{} on {el:?}", ev.event_type())),
		),
	)?;

	button.dispatch_event(&Event::bubbling("click"));

	println!("HTML:\n\n{}", doc.to_html()?);

	Ok(())
}
