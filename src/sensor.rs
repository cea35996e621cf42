//! The sensor: a header-described row source plus the encoder built for it.
//!
//! Lifecycle:
//!
//! ```text
//! Unconfigured --set_local_parameters--> Configured
//!      |                                     |
//!      +----------input/output_stream--------+--> Draining --exhausted--> Terminal
//! ```
//!
//! The header is read when the sensor is built. Encoder settings can be
//! replaced any number of times until a stream is taken; the source can be
//! streamed exactly once.

use std::fmt;
use std::sync::Arc;

use crate::config::{EncoderParameters, SensorParams};
use crate::encoders::MultiEncoder;
use crate::error::{Result, SensorError};
use crate::meta::{SourceMeta, HEADER_LINES};
use crate::registry::EncoderRegistry;
use crate::source::{Row, RowSource};
use crate::spec::{merge_spec, EncoderSpec};
use crate::stream::{TerminalFlag, TerminalTracking};
use crate::types::Sdr;

type BoxedSource = Box<dyn RowSource>;
type Factory = Box<dyn FnOnce(&SensorParams) -> Result<BoxedSource>>;

/// Where a sensor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorState {
    /// Header inferred, no encoder settings applied.
    Unconfigured,
    /// Encoder built, source not yet streamed.
    Configured,
    /// A stream owns the source and has not reported its end.
    Draining,
    /// The stream has returned its last item.
    Terminal,
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensorState::Unconfigured => "unconfigured",
            SensorState::Configured => "configured",
            SensorState::Draining => "draining",
            SensorState::Terminal => "terminal",
        };
        f.write_str(s)
    }
}

/// Builder for [`Sensor`].
#[derive(Default)]
pub struct SensorBuilder {
    factory: Option<Factory>,
    params: Option<SensorParams>,
    registry: Option<EncoderRegistry>,
}

impl fmt::Debug for SensorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorBuilder")
            .field("factory", &self.factory.is_some())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl SensorBuilder {
    /// Sets the function that opens the row source.
    pub fn factory<F, S>(mut self, factory: F) -> Self
    where
        F: FnOnce(&SensorParams) -> Result<S> + 'static,
        S: RowSource + 'static,
    {
        self.factory = Some(Box::new(move |params: &SensorParams| {
            factory(params).map(|source| Box::new(source) as BoxedSource)
        }));
        self
    }

    /// Sets the parameters handed to the factory.
    pub fn params(mut self, params: SensorParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Uses `registry` instead of [`EncoderRegistry::default`].
    pub fn registry(mut self, registry: EncoderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Opens the source and infers its metadata from the header.
    ///
    /// # Errors
    ///
    /// - [`SensorError::MissingFactory`] / [`SensorError::MissingParams`]
    /// - any error of the factory or of reading the header rows
    /// - [`SensorError::MalformedHeader`] if the header is short or invalid
    pub fn build(self) -> Result<Sensor> {
        let factory = self.factory.ok_or(SensorError::MissingFactory)?;
        let params = self.params.ok_or(SensorError::MissingParams)?;

        let mut source = factory(&params)?;
        let header = source
            .by_ref()
            .take(HEADER_LINES)
            .collect::<Result<Vec<Row>>>()?;
        if header.len() < HEADER_LINES {
            return Err(SensorError::MalformedHeader(format!(
                "expected {HEADER_LINES} header rows, source has {}",
                header.len()
            )));
        }
        let meta = SourceMeta::infer(&header)?;
        tracing::debug!(
            fields = meta.len(),
            names = ?meta.field_names(),
            "inferred source metadata"
        );

        Ok(Sensor {
            params,
            meta: Arc::new(meta),
            registry: self.registry.unwrap_or_default(),
            spec: None,
            encoder: Arc::new(MultiEncoder::empty()),
            source: Some(source),
            terminal: TerminalFlag::new(),
        })
    }
}

/// Rows of a sensor's source, checked against the header width.
pub struct InputRows {
    source: BoxedSource,
    width: usize,
}

impl fmt::Debug for InputRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRows")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl Iterator for InputRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let width = self.width;
        self.source.next().map(|row| {
            let row = row?;
            if row.len() == width {
                Ok(row)
            } else {
                Err(SensorError::RowWidth {
                    expected: width,
                    actual: row.len(),
                })
            }
        })
    }
}

/// Encoded rows of a sensor's source.
pub struct OutputRows {
    source: BoxedSource,
    meta: Arc<SourceMeta>,
    encoder: Arc<MultiEncoder>,
}

impl fmt::Debug for OutputRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputRows")
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl Iterator for OutputRows {
    type Item = Result<Sdr>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next().map(|row| {
            let row = row?;
            let record = self.encoder.parse_row(&self.meta, &row)?;
            self.encoder.encode(&record)
        })
    }
}

/// Stream of raw data rows.
pub type InputStream = TerminalTracking<InputRows>;

/// Stream of encoded data rows.
pub type OutputStream = TerminalTracking<OutputRows>;

/// Turns a header-described row source into a stream of SDRs.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::prelude::*;
///
/// let mut sensor = Sensor::builder()
///     .factory(CsvSource::create)
///     .params(SensorParams::inline("flag\nbool\nB\ntrue\nfalse\n"))
///     .build()
///     .unwrap();
/// assert_eq!(sensor.state(), SensorState::Unconfigured);
///
/// let params = EncoderParameters::from_json_str(r#"{ "fieldEncodings": { "flag": { "w": 3 } } }"#)
///     .unwrap();
/// sensor.set_local_parameters(&params).unwrap();
/// assert_eq!(sensor.encoder().size(), 6);
///
/// let bits: Vec<Vec<u32>> = sensor
///     .output_stream()
///     .unwrap()
///     .map(|sdr| sdr.map(|s| s.get_sparse()))
///     .collect::<Result<_>>()
///     .unwrap();
/// assert_eq!(bits, vec![vec![0, 1, 2], vec![3, 4, 5]]);
/// assert_eq!(sensor.state(), SensorState::Terminal);
/// ```
pub struct Sensor {
    params: SensorParams,
    meta: Arc<SourceMeta>,
    registry: EncoderRegistry,
    spec: Option<EncoderSpec>,
    encoder: Arc<MultiEncoder>,
    source: Option<BoxedSource>,
    terminal: TerminalFlag,
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("state", &self.state())
            .field("meta", &self.meta)
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl Sensor {
    /// Starts building a sensor.
    pub fn builder() -> SensorBuilder {
        SensorBuilder::default()
    }

    /// Returns the parameters the source was opened with.
    pub fn params(&self) -> &SensorParams {
        &self.params
    }

    /// Returns the metadata inferred from the header.
    pub fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    /// Returns the merged encoder settings, once configured.
    pub fn spec(&self) -> Option<&EncoderSpec> {
        self.spec.as_ref()
    }

    /// Returns the composed encoder. It has no fields until configured.
    pub fn encoder(&self) -> &MultiEncoder {
        &self.encoder
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SensorState {
        if self.terminal.is_set() {
            SensorState::Terminal
        } else if self.source.is_none() {
            SensorState::Draining
        } else if self.spec.is_some() {
            SensorState::Configured
        } else {
            SensorState::Unconfigured
        }
    }

    /// Returns true once a stream of this sensor has been fully drained.
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_set()
    }

    /// Merges `params` over the inferred metadata and builds the encoder.
    ///
    /// May be called repeatedly before a stream is taken; the last call wins.
    /// On error the previous configuration is kept.
    ///
    /// # Errors
    ///
    /// - [`SensorError::AlreadyConsumed`] once a stream has been taken
    /// - any merge, registry or encoder construction error
    pub fn set_local_parameters(&mut self, params: &EncoderParameters) -> Result<()> {
        if self.source.is_none() {
            return Err(SensorError::AlreadyConsumed);
        }

        let spec = merge_spec(&params.defaults, &params.field_encodings, &self.meta)?;
        let encoder = MultiEncoder::compose(&self.meta, &spec, &self.registry)?;
        tracing::info!(
            fields = encoder.num_encoders(),
            width = encoder.size(),
            "sensor configured"
        );

        self.spec = Some(spec);
        self.encoder = Arc::new(encoder);
        Ok(())
    }

    fn take_source(&mut self) -> Result<BoxedSource> {
        self.source.take().ok_or(SensorError::AlreadyConsumed)
    }

    /// Takes the source as a stream of raw data rows.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::AlreadyConsumed`] if a stream was taken before.
    pub fn input_stream(&mut self) -> Result<InputStream> {
        let rows = InputRows {
            source: self.take_source()?,
            width: self.meta.len(),
        };
        Ok(TerminalTracking::with_flag(rows, self.terminal.clone()))
    }

    /// Takes the source as a stream of encoded rows.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::AlreadyConsumed`] if a stream was taken before.
    pub fn output_stream(&mut self) -> Result<OutputStream> {
        let rows = OutputRows {
            source: self.take_source()?,
            meta: Arc::clone(&self.meta),
            encoder: Arc::clone(&self.encoder),
        };
        Ok(TerminalTracking::with_flag(rows, self.terminal.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CsvSource;

    const CSV: &str = "name,value\nstring,float\n,\na,1.5\nb,2.5\n";

    fn sensor(text: &str) -> Result<Sensor> {
        Sensor::builder()
            .factory(CsvSource::create)
            .params(SensorParams::inline(text))
            .build()
    }

    #[test]
    fn test_builder_requires_factory_and_params() {
        let err = Sensor::builder()
            .params(SensorParams::inline(CSV))
            .build()
            .unwrap_err();
        assert!(matches!(err, SensorError::MissingFactory));
        assert_eq!(err.to_string(), "Factory cannot be absent");

        let err = Sensor::builder().factory(CsvSource::create).build().unwrap_err();
        assert!(matches!(err, SensorError::MissingParams));
    }

    #[test]
    fn test_short_header() {
        let err = sensor("name,value\nstring,float\n").unwrap_err();
        assert!(matches!(err, SensorError::MalformedHeader(_)));
    }

    #[test]
    fn test_factory_error_propagates() {
        let err = Sensor::builder()
            .factory(|_: &SensorParams| -> Result<std::vec::IntoIter<Result<Row>>> {
                Err(SensorError::Source("offline".to_string()))
            })
            .params(SensorParams::inline(""))
            .build()
            .unwrap_err();
        assert!(matches!(err, SensorError::Source(_)));
    }

    #[test]
    fn test_any_iterator_is_a_source() {
        let rows: Vec<Result<Row>> = ["x", "int", "", "7"]
            .iter()
            .map(|c| Ok(vec![(*c).to_string()]))
            .collect();
        let mut sensor = Sensor::builder()
            .factory(move |_: &SensorParams| Ok(rows.into_iter()))
            .params(SensorParams::inline(""))
            .build()
            .unwrap();
        assert_eq!(sensor.meta().field_names(), vec!["x"]);

        let rows: Vec<Row> = sensor.input_stream().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows, vec![vec!["7".to_string()]]);
    }

    #[test]
    fn test_lifecycle_states() {
        let mut sensor = sensor(CSV).unwrap();
        assert_eq!(sensor.state(), SensorState::Unconfigured);
        assert!(sensor.encoder().is_empty());

        let params = EncoderParameters::from_json_str(
            r#"{ "fieldEncodings": { "value": { "n": 30, "w": 3, "minVal": 0, "maxVal": 10 } } }"#,
        )
        .unwrap();
        sensor.set_local_parameters(&params).unwrap();
        assert_eq!(sensor.state(), SensorState::Configured);
        assert_eq!(sensor.encoder().size(), 30);

        let mut stream = sensor.output_stream().unwrap();
        assert_eq!(sensor.state(), SensorState::Draining);
        assert!(stream.next().unwrap().is_ok());
        assert!(!sensor.is_terminal());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().is_none());
        assert!(sensor.is_terminal());
        assert_eq!(sensor.state(), SensorState::Terminal);

        assert!(matches!(
            sensor.set_local_parameters(&params),
            Err(SensorError::AlreadyConsumed)
        ));
        assert!(matches!(
            sensor.input_stream(),
            Err(SensorError::AlreadyConsumed)
        ));
    }

    #[test]
    fn test_failed_configuration_keeps_previous() {
        let mut sensor = sensor(CSV).unwrap();
        let good = EncoderParameters::from_json_str(
            r#"{ "fieldEncodings": { "value": { "n": 30, "w": 3, "minVal": 0, "maxVal": 10 } } }"#,
        )
        .unwrap();
        sensor.set_local_parameters(&good).unwrap();

        let bad =
            EncoderParameters::from_json_str(r#"{ "fieldEncodings": { "missing": { "w": 3 } } }"#)
                .unwrap();
        let err = sensor.set_local_parameters(&bad).unwrap_err();
        assert!(matches!(err, SensorError::UnknownField { ref field } if field == "missing"));
        assert_eq!(sensor.encoder().size(), 30);
    }

    #[test]
    fn test_field_name_labels_the_layout() {
        let mut sensor = sensor(CSV).unwrap();
        let params = EncoderParameters::from_json_str(
            r#"{ "fieldEncodings": { "value": {
                "n": 30, "w": 3, "minVal": 0, "maxVal": 10, "fieldName": "reading"
            } } }"#,
        )
        .unwrap();
        sensor.set_local_parameters(&params).unwrap();

        let layout = sensor.encoder().describe();
        assert_eq!(layout[0].name, "value");
        assert_eq!(layout[0].label, "reading");
        assert!(sensor.encoder().get("value").is_some());
    }

    #[test]
    fn test_oversized_scalar_is_a_configuration_error() {
        let mut sensor = sensor(CSV).unwrap();
        let params = EncoderParameters::from_json_str(
            r#"{ "fieldEncodings": { "value": { "w": 3, "minVal": 0, "maxVal": 100, "resolution": 1e-12 } } }"#,
        )
        .unwrap();

        let err = sensor.set_local_parameters(&params).unwrap_err();
        assert!(matches!(err, SensorError::InvalidParameter { .. }));
        assert_eq!(sensor.state(), SensorState::Unconfigured);
    }

    #[test]
    fn test_row_width_is_checked() {
        let mut sensor = sensor("a,b\nint,int\n,\n1,2\n3\n").unwrap();
        let rows: Vec<Result<Row>> = sensor.input_stream().unwrap().collect();
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(SensorError::RowWidth {
                expected: 2,
                actual: 1
            })
        ));
    }
}
