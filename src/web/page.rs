//! HTML for the single page.

use crate::batch::StatusReport;
use crate::speech::{Emotion, MAX_RATE_PERCENT, MIN_RATE_PERCENT};

const STYLE: &str = "body{font-family:sans-serif;max-width:40em;margin:2em auto;padding:0 1em}\
fieldset{margin-bottom:1.5em}label{display:block;margin:.5em 0}\
#message{padding:.75em;background:#f3f3f3;border-radius:4px}";

pub fn render(report: &StatusReport, pending: usize) -> String {
    let mut emotions = String::from(r#"<option value="none">none</option>"#);
    for emotion in Emotion::ALL {
        emotions.push_str(&format!(
            r#"<option value="{0}">{0}</option>"#,
            emotion.as_str()
        ));
    }

    let message = if report.is_empty() {
        String::new()
    } else {
        format!(r#"<div id="message">{}</div>"#, report.to_html())
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>voicebatch</title>
<style>{style}</style>
</head>
<body>
<h1>Voice clone batch</h1>
{message}
<form action="/upload" method="post" enctype="multipart/form-data">
<fieldset>
<legend>1. Upload voice samples</legend>
<label>Audio files <input type="file" name="audio_files" accept="audio/*" multiple></label>
<button type="submit">Upload</button>
<p>{pending} file(s) waiting for generation.</p>
</fieldset>
</form>
<form action="/generate" method="post">
<fieldset>
<legend>2. Generate clips</legend>
<label>Emotion <select name="emotion">{emotions}</select></label>
<label>Rate (%) <input type="number" name="rate" min="{min}" max="{max}" step="1" value="0"></label>
<button type="submit">Generate</button>
</fieldset>
</form>
</body>
</html>
"#,
        style = STYLE,
        message = message,
        pending = pending,
        emotions = emotions,
        min = MIN_RATE_PERCENT,
        max = MAX_RATE_PERCENT,
    )
}
