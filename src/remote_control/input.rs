use std::path::Path;

use log::{debug, info, warn};

use super::types::{KeyCode, ScreenSize};
use crate::command_channel::{shell_quote, CommandChannel};
use crate::error_handling::types::{BridgeError, DecodeIssue};
use crate::listing::property_decoder::decode_screen_size;
use crate::mutations::Outcome;
use crate::session_management::DeviceSession;

pub const DEFAULT_SWIPE_MILLIS: u32 = 300;

pub async fn tap(
    channel: &CommandChannel,
    session: &DeviceSession,
    x: u32,
    y: u32,
) -> Result<Outcome, BridgeError> {
    debug!("[{}] tap at ({}, {})", session.serial(), x, y);
    let reply = channel
        .run_classified(session, &format!("input tap {} {}", x, y))
        .await?;
    Ok(Outcome::from_reply("tap", &reply))
}

pub async fn swipe(
    channel: &CommandChannel,
    session: &DeviceSession,
    from: (u32, u32),
    to: (u32, u32),
    duration_ms: u32,
) -> Result<Outcome, BridgeError> {
    debug!(
        "[{}] swipe from {:?} to {:?} over {}ms",
        session.serial(),
        from,
        to,
        duration_ms
    );
    let command = format!(
        "input swipe {} {} {} {} {}",
        from.0, from.1, to.0, to.1, duration_ms
    );
    let reply = channel.run_classified(session, &command).await?;
    Ok(Outcome::from_reply("swipe", &reply))
}

pub async fn send_text(
    channel: &CommandChannel,
    session: &DeviceSession,
    text: &str,
) -> Result<Outcome, BridgeError> {
    if text.is_empty() {
        return Ok(Outcome::Success);
    }
    debug!("[{}] text input of {} chars", session.serial(), text.chars().count());
    let reply = channel
        .run_classified(session, &format!("input text {}", escape_input_text(text)))
        .await?;
    Ok(Outcome::from_reply("text", &reply))
}

pub async fn send_key(
    channel: &CommandChannel,
    session: &DeviceSession,
    key: KeyCode,
) -> Result<Outcome, BridgeError> {
    debug!("[{}] key event {}", session.serial(), key);
    let reply = channel
        .run_classified(session, &format!("input keyevent {}", key.code()))
        .await?;
    Ok(Outcome::from_reply("key", &reply))
}

pub async fn screen_size(
    channel: &CommandChannel,
    session: &DeviceSession,
) -> Result<ScreenSize, BridgeError> {
    let text = channel.run(session, "wm size").await?;
    match decode_screen_size(&text) {
        Some((width, height)) => Ok(ScreenSize { width, height }),
        None => Err(BridgeError::Unparsable(DecodeIssue::Shape(
            text.trim().to_string(),
        ))),
    }
}

/// Captures the screen into `remote_scratch` on the device, pulls it to
/// `local` and removes the scratch file again.
pub async fn screenshot(
    channel: &CommandChannel,
    session: &DeviceSession,
    remote_scratch: &str,
    local: &Path,
) -> Result<Outcome, BridgeError> {
    let remote = shell_quote(remote_scratch);
    let capture = channel
        .run_classified(session, &format!("screencap -p {}", remote))
        .await?;
    if capture.rejection.is_some() {
        let outcome = Outcome::from_reply("screencap", &capture);
        warn!("[{}] screenshot: {}", session.serial(), outcome);
        return Ok(outcome);
    }

    let pulled = channel.pull(session, remote_scratch, local).await;
    // scratch file goes regardless of how the pull went
    if let Err(e) = channel.run(session, &format!("rm -f {}", remote)).await {
        warn!("[{}] could not remove {}: {}", session.serial(), remote_scratch, e);
    }

    let outcome = Outcome::from_reply("pull", &pulled?);
    if outcome.is_success() {
        info!("[{}] screenshot saved to {}", session.serial(), local.display());
    }
    Ok(outcome)
}

/// Escapes text for `input text`: spaces become `%s`, `&` is backslashed and
/// the whole argument is single quoted.
pub fn escape_input_text(text: &str) -> String {
    let escaped = text
        .replace(' ', "%s")
        .replace('&', r"\&")
        .replace('\'', r"'\''");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn setup() -> (Arc<ScriptedTransport>, DeviceSession, CommandChannel) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = DeviceSession::new("R58M123ABC", Uuid::new_v4(), transport.clone());
        let channel = CommandChannel::new(Duration::from_secs(5), Duration::from_secs(5));
        (transport, session, channel)
    }

    #[test]
    fn test_escape_input_text() {
        assert_eq!(escape_input_text("hello world"), "'hello%sworld'");
        assert_eq!(escape_input_text("a&b"), r"'a\&b'");
        assert_eq!(escape_input_text("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn test_input_commands() {
        let (transport, session, channel) = setup();

        tap(&channel, &session, 540, 1200).await.unwrap();
        swipe(&channel, &session, (100, 1500), (100, 300), DEFAULT_SWIPE_MILLIS)
            .await
            .unwrap();
        send_text(&channel, &session, "Fish & Chips").await.unwrap();
        send_key(&channel, &session, KeyCode::Home).await.unwrap();

        assert_eq!(
            transport.issued(),
            vec![
                "input tap 540 1200".to_string(),
                "input swipe 100 1500 100 300 300".to_string(),
                r"input text 'Fish%s\&%sChips'".to_string(),
                "input keyevent 3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_not_sent() {
        let (transport, session, channel) = setup();
        assert!(send_text(&channel, &session, "").await.unwrap().is_success());
        assert!(transport.issued().is_empty());
    }

    #[tokio::test]
    async fn test_screen_size() {
        let (transport, session, channel) = setup();
        transport.reply("wm size", "Physical size: 1080x2400\n");
        assert_eq!(
            screen_size(&channel, &session).await.unwrap(),
            ScreenSize {
                width: 1080,
                height: 2400
            }
        );

        transport.reply("wm size", "cmd: Can't find service: window\n");
        assert!(matches!(
            screen_size(&channel, &session).await,
            Err(BridgeError::Unparsable(_))
        ));
    }

    #[tokio::test]
    async fn test_screenshot_cleans_up() {
        let (transport, session, channel) = setup();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("shot.png");

        let outcome = screenshot(&channel, &session, "/sdcard/screenshot.png", &local)
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            transport.issued(),
            vec![
                "screencap -p '/sdcard/screenshot.png'".to_string(),
                format!("pull /sdcard/screenshot.png {}", local.display()),
                "rm -f '/sdcard/screenshot.png'".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_screenshot_capture_rejected() {
        let (transport, session, channel) = setup();
        transport.reply(
            "screencap -p '/sdcard/screenshot.png'",
            "Error opening file: /sdcard/screenshot.png (Permission denied)\n",
        );
        let dir = tempfile::tempdir().unwrap();

        let outcome = screenshot(
            &channel,
            &session,
            "/sdcard/screenshot.png",
            &dir.path().join("shot.png"),
        )
        .await
        .unwrap();
        assert!(!outcome.is_success());
        assert_eq!(transport.issued().len(), 1);
    }
}
