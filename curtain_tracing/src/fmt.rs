use crate::{FormatFlavor, TracingConfig};
use tracing_core::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::Layer as FmtLayer;
use tracing_subscriber::fmt::format::Format;
use tracing_subscriber::registry::LookupSpan;

/// Creates a [formatted `Layer`](FmtLayer) based on the given
/// [config](TracingConfig), filtered by its verbosity levels.
pub fn make_layer<S>(config: impl AsRef<TracingConfig>) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let config = config.as_ref();
    let targets = make_targets(config);

    // The timer is part of the layer type, so each flavor is boxed separately
    macro_rules! finish {
        ($layer:expr) => {{
            let layer = preconfigure($layer, config);
            let boxed: Box<dyn Layer<S> + Send + Sync> = if config.show_timestamp() {
                Box::new(layer.with_filter(targets))
            } else {
                Box::new(layer.without_time().with_filter(targets))
            };

            boxed
        }};
    }

    match config.flavor() {
        FormatFlavor::Full => finish!(tracing_subscriber::fmt::layer()),
        FormatFlavor::Compact => finish!(tracing_subscriber::fmt::layer().compact()),
        FormatFlavor::Pretty => finish!(tracing_subscriber::fmt::layer().pretty()),
        #[cfg(feature = "json")]
        FormatFlavor::Json => finish!(tracing_subscriber::fmt::layer().json()),
    }
}

/// Applies the presentation choices of the given config to a base layer.
fn preconfigure<S, N, L, T, W>(
    layer: FmtLayer<S, N, Format<L, T>, W>,
    config: &TracingConfig,
) -> FmtLayer<S, N, Format<L, T>, W>
where
    N: for<'writer> FormatFields<'writer> + 'static,
{
    // Escape codes would corrupt structured output
    #[cfg(feature = "json")]
    let color = config.color() && config.flavor() != FormatFlavor::Json;
    #[cfg(not(feature = "json"))]
    let color = config.color();

    layer
        .with_ansi(color)
        .with_target(config.show_target())
        .with_level(config.show_level())
        .with_thread_ids(config.show_thread_id())
        .with_thread_names(config.show_thread_name())
}

/// Translates the root and per-target verbosity levels into a [`Targets`]
/// filter.
fn make_targets(config: &TracingConfig) -> Targets {
    Targets::new()
        .with_default(config.verbosity())
        .with_targets(
            config
                .targets()
                .iter()
                .map(|(target, verbosity)| (target.clone(), *verbosity)),
        )
}
