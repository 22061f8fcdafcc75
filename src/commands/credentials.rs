use anyhow::{Context, Result, bail};
use std::io::Write;

use super::Core;
use crate::attempts::LOCKOUT_THRESHOLD;
use crate::auth::VerifyFailure;
use crate::cli::Toggle;

/// Set the password, optionally with a recovery question.
pub async fn set_password(core: &Core, question: Option<String>) -> Result<()> {
    if core.credentials.has_credential().await? {
        println!("A password is already configured; it will be replaced.");
    }

    let password = prompt_new_password()?;

    let security = match question {
        Some(question) => {
            let answer = prompt_line(&format!("Answer to \"{}\": ", question))?;
            if answer.trim().is_empty() {
                bail!("Security answer must not be empty");
            }
            Some((question, answer))
        }
        None => None,
    };

    core.credentials
        .set_password(
            &password,
            security.as_ref().map(|(q, a)| (q.as_str(), a.as_str())),
        )
        .await?;

    println!("✓ Password set");
    if security.is_some() {
        println!("✓ Security question stored for recovery");
    } else {
        println!("  No security question configured; recovery will be unavailable.");
    }
    Ok(())
}

/// Verify the password and report the attempt state.
pub async fn verify(core: &Core) -> Result<()> {
    let password = rpassword::prompt_password("Password: ")?;

    let outcome = core.credentials.verify_password(&password).await?;
    if outcome.success {
        println!("✓ Password correct");
        return Ok(());
    }

    if outcome.reason == Some(VerifyFailure::NoCredential) {
        bail!("No password has been configured. Run 'app-blocker set-password' first.");
    }

    let attempts = core.credentials.failed_attempts().await?;
    println!("✗ Password incorrect ({} consecutive failures)", attempts.count);
    if attempts.locked {
        println!(
            "  Locked: {} or more consecutive failures. A correct password still unlocks.",
            LOCKOUT_THRESHOLD
        );
    }
    Ok(())
}

/// Change the password after verifying the current one.
pub async fn change_password(core: &Core) -> Result<()> {
    let old = rpassword::prompt_password("Current password: ")?;
    let new = prompt_new_password()?;

    core.credentials.change_password(&old, &new).await?;
    println!("✓ Password changed");
    Ok(())
}

/// Print the configured security question.
pub async fn show_question(core: &Core) -> Result<()> {
    let question = core.credentials.security_question().await?;
    if question.is_empty() {
        println!("No security question configured.");
    } else {
        println!("{question}");
    }
    Ok(())
}

/// Recover the password by answering the security question.
pub async fn recover(core: &Core) -> Result<()> {
    let question = core.credentials.security_question().await?;
    if question.is_empty() {
        bail!("No security question configured; recovery is unavailable.");
    }

    let answer = prompt_line(&format!("{} ", question))?;
    let new = prompt_new_password()?;

    if core
        .credentials
        .reset_password_with_answer(&answer, &new)
        .await?
    {
        println!("✓ Password reset");
    } else {
        println!("✗ Answer does not match");
    }
    Ok(())
}

/// Toggle block notifications.
pub async fn notifications(core: &Core, state: Toggle) -> Result<()> {
    let enabled = matches!(state, Toggle::On);
    core.settings.set_notifications_enabled(enabled).await?;
    println!(
        "✓ Block notifications {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Show credential, blocking and statistics status.
pub async fn status(core: &Core) -> Result<()> {
    println!("App Blocker Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if core.credentials.has_credential().await? {
        println!("Password:       configured");
    } else {
        println!("Password:       not set");
    }

    let question = core.credentials.security_question().await?;
    if question.is_empty() {
        println!("Recovery:       unavailable (no security question)");
    } else {
        println!("Recovery:       available");
    }

    let attempts = core.credentials.failed_attempts().await?;
    if attempts.locked {
        println!("Failed logins:  {} (locked)", attempts.count);
    } else {
        println!("Failed logins:  {}", attempts.count);
    }

    let notifications = core.settings.notifications_enabled().await?;
    println!(
        "Notifications:  {}",
        if notifications { "on" } else { "off" }
    );

    let blocked = core.blocklist.blocked().await?;
    println!("Blocked apps:   {}", blocked.len());

    let stats = core.aggregator.snapshot().await?;
    println!(
        "Blocks:         {} ({} minutes saved since {})",
        stats.total_blocks,
        stats.time_saved_minutes,
        stats.last_reset.format("%Y-%m-%d")
    );

    Ok(())
}

/// Prompt for a new password twice and insist the entries match.
fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("New password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
