use clap::Args;
use dayplan_core::{classify_text, is_physical_location};

#[derive(Args)]
pub struct ClassifyArgs {
    /// Event title
    title: String,
    /// Event description
    #[arg(long)]
    description: Option<String>,
    /// Event location
    #[arg(long)]
    location: Option<String>,
}

pub fn run(args: ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let anchor_type = classify_text(&args.title, args.description.as_deref());
    let must_attend = is_physical_location(args.location.as_deref());
    println!(
        "{}",
        serde_json::json!({
            "type": anchor_type,
            "must_attend": must_attend,
        })
    );
    Ok(())
}
