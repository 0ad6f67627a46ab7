use serde::Deserialize;

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Move every complete UTF-8 sequence from `bytes` into `pending`. A
/// character split across network chunks stays in `bytes` until the rest of
/// it arrives; bytes that can never be valid become U+FFFD.
pub(crate) fn decode_utf8_prefix(bytes: &mut Vec<u8>, pending: &mut String) {
    loop {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                pending.push_str(text);
                bytes.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                pending.push_str(&String::from_utf8_lossy(&bytes[..valid]));
                match e.error_len() {
                    None => {
                        bytes.drain(..valid);
                        return;
                    }
                    Some(bad) => {
                        pending.push(char::REPLACEMENT_CHARACTER);
                        bytes.drain(..valid + bad);
                    }
                }
            }
        }
    }
}

/// Consume every complete SSE frame in `pending`, appending text deltas to
/// `merged`. A trailing partial frame stays in `pending` for the next chunk.
pub(crate) fn drain_sse_frames<F>(pending: &mut String, merged: &mut String, on_delta: &mut F)
where
    F: FnMut(&str) + ?Sized,
{
    loop {
        if let Some(pos) = pending.find("\n\n") {
            let frame = pending[..pos].to_string();
            pending.drain(..pos + 2);
            handle_sse_frame(&frame, merged, on_delta);
            continue;
        }
        if let Some(pos) = pending.find("\r\n\r\n") {
            let frame = pending[..pos].to_string();
            pending.drain(..pos + 4);
            handle_sse_frame(&frame, merged, on_delta);
            continue;
        }
        break;
    }
}

/// Flush whatever is left once the stream has ended without a final blank line.
pub(crate) fn flush_sse_tail<F>(pending: &mut String, merged: &mut String, on_delta: &mut F)
where
    F: FnMut(&str) + ?Sized,
{
    drain_sse_frames(pending, merged, on_delta);
    if !pending.trim().is_empty() {
        let frame = std::mem::take(pending);
        handle_sse_frame(&frame, merged, on_delta);
    }
    pending.clear();
}

fn handle_sse_frame<F>(frame: &str, merged: &mut String, on_delta: &mut F)
where
    F: FnMut(&str) + ?Sized,
{
    for raw_line in frame.lines() {
        let line = raw_line.trim_end_matches('\r');
        let Some(data) = line
            .strip_prefix("data: ")
            .or_else(|| line.strip_prefix("data:"))
        else {
            continue;
        };
        if data.is_empty() || data == "[DONE]" {
            continue;
        }
        let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
            continue;
        };
        let Some(choice) = event.choices.into_iter().next() else {
            continue;
        };
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            merged.push_str(&text);
            on_delta(&text);
        }
    }
}
