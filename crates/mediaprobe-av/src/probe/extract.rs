//! Copying probe results out of native memory.

use super::session::Selected;
use crate::ffi::{CodecView, FormatView};
use crate::metadata::{DurationSource, Metadata};
use crate::{Error, Result};

/// Build the output record from the opened container and the selected
/// streams.
pub(crate) fn extract(
    view: FormatView<'_>,
    video: &Selected<'_>,
    audio: Option<&Selected<'_>>,
) -> Result<Metadata> {
    let stream = view.stream(video.index).ok_or(Error::FormatNotAvailable)?;

    let (duration, duration_source) = match view.duration() {
        d if d >= 0 => (d, DurationSource::Container),
        _ if stream.duration() >= 0 => (stream.duration(), DurationSource::VideoStream),
        _ => (stream.duration(), DurationSource::Unknown),
    };

    Ok(Metadata {
        duration,
        duration_source,
        width: stream.width(),
        height: stream.height(),
        delay: stream.delay(),
        video_codec: video.decoder.as_ref().and_then(CodecView::display_name),
        audio_codec: audio
            .and_then(|a| a.decoder.as_ref())
            .and_then(CodecView::display_name),
        format: view.format_name(),
    })
}
