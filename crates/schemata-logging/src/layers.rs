//! JSON formatting layer shared by the console and file sinks

use tracing::Subscriber;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

use crate::config::JsonFormat;

/// JSON lines layer writing to `writer`
pub fn json_layer<S, W>(
    writer: W,
    format: &JsonFormat,
) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(format.span_list)
        .flatten_event(format.flatten)
        .with_file(format.location)
        .with_line_number(format.location)
        .with_thread_ids(format.thread)
        .with_thread_names(format.thread)
        .with_writer(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    #[test]
    fn test_layer_builds_for_registry() {
        let _layer: fmt::Layer<Registry, _, _, _> =
            json_layer(std::io::sink, &JsonFormat::default());
    }
}
