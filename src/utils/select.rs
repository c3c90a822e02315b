use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Select};
use log::{debug, info};

/// Let the operator pick one of the configured platforms. Returns `None` when
/// the selection is cancelled or nothing can be shown.
pub(crate) fn select_platform(platforms: &[String]) -> Option<String> {
    if platforms.is_empty() {
        debug!("no platform to select from");
        return None;
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .items(platforms)
        .with_prompt(format!(
            "Select the board to work with (`{}` to cancel):",
            style("Esc").cyan()
        ))
        .default(0)
        .interact_on_opt(&Term::stderr());

    match selection {
        Ok(Some(index)) => platforms.get(index).cloned(),
        Ok(None) => {
            debug!("user did not select any platform");
            None
        }
        Err(ref e) => {
            info!("error: {}", e);
            None
        }
    }
}
