//! User-Friendly Error Formatting
//!
//! Turns a failure at the binary boundary into a message with likely causes
//! and what to check next.

use std::fmt::Write;

/// Format error for user consumption
///
/// The whole context chain is inspected to pick a category; the chain is
/// printed verbatim under "Technical Details".
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    let chain = format!("{:#}", error);
    let lowered = chain.to_lowercase();

    if lowered.contains("scenario") {
        format_scenario_error(&mut output);
    } else if lowered.contains("topology store") || lowered.contains("settings") {
        format_settings_error(&mut output);
    } else if lowered.contains("render service") || lowered.contains("callback") {
        format_render_error(&mut output);
    } else if lowered.contains("config") {
        format_config_error(&mut output);
    } else if lowered.contains("already has an in-use session") || lowered.contains("not found") {
        format_screen_error(&mut output);
    } else {
        format_generic_error(&mut output, &error.to_string());
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{}", chain).ok();
    writeln!(&mut output).ok();

    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: lamco-screen-coordinator -vvv"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Power transitions are logged as 'Power FSM: <from> -> <to>'"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_scenario_error(output: &mut String) {
    writeln!(output, "Scenario Error").ok();
    writeln!(output).ok();
    writeln!(output, "The scenario file could not be loaded or replayed.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid JSON").ok();
    writeln!(output, "     → The file must be an object with a \"steps\" array").ok();
    writeln!(output, "     → Every step needs an \"op\" field").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Unknown operation or power call").ok();
    writeln!(
        output,
        "     → op: connect, disconnect, fold, set_mode, set_position, swap_internal,"
    )
    .ok();
    writeln!(output, "           create_virtual, destroy_virtual, power, sleep").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Step refers to a screen that is not connected").ok();
    writeln!(output, "     → Connect the panel in an earlier step").ok();
}

fn format_settings_error(output: &mut String) {
    writeln!(output, "Topology Store Error").ok();
    writeln!(output).ok();
    writeln!(output, "Persisted multi-screen topology could not be read or written.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Store file is not valid TOML").ok();
    writeln!(output, "     → Move the file away; it is recreated on the next change").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Directory not writable").ok();
    writeln!(output, "     → Check permissions of the --settings path").ok();
}

fn format_render_error(output: &mut String) {
    writeln!(output, "Render Service Error").ok();
    writeln!(output).ok();
    writeln!(output, "The render service rejected a call or is unavailable.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Power callback registration kept failing").ok();
    writeln!(output, "     → Raise [power] register_retry_count or register_retry_delay_ms").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Render service not started yet").ok();
    writeln!(output, "     → Start the coordinator after the render service is up").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Configuration file not found").ok();
    writeln!(output, "     → Specify: lamco-screen-coordinator -c /path/to/config.toml").ok();
    writeln!(output, "     → Without -c the built-in defaults are used").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Rejected values").ok();
    writeln!(output, "     → Timeouts must be greater than zero").ok();
    writeln!(
        output,
        "     → foldable and dual_panel need distinct inner_panel and outer_panel"
    )
    .ok();
}

fn format_screen_error(output: &mut String) {
    writeln!(output, "Screen Error").ok();
    writeln!(output).ok();
    writeln!(output, "An operation referred to a screen in the wrong state.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Panel connected twice without a disconnect").ok();
    writeln!(output, "  2. Surface or logical id not known to the coordinator").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Coordinator Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while coordinating screens.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_user_error() {
        let error = anyhow::anyhow!("Failed to parse scenario");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("Scenario Error"));
    }

    #[test]
    fn test_context_chain_is_inspected() {
        let error = anyhow::anyhow!("expected `=`").context("Failed to parse config file");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Configuration Error"));
        assert!(formatted.contains("expected `=`"));
    }

    #[test]
    fn test_screen_error_formatting() {
        let error = anyhow::Error::new(crate::error::ScreenError::DuplicateConnect(
            crate::screen::PhysicalSurfaceId(4),
        ));
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Screen Error"));
    }
}
