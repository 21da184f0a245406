//! Collaborator-facing views of a run: the element table printed before a
//! run, a statistical summary of the series, and the JSON document written
//! for downstream plotting.

use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::body::CentralBody;
use crate::constants::*;
use crate::elements::OrbitalElements;
use crate::propagator::{Ephemeris, PropagationSample, RunStatus};

/// Human-readable table of the initial elements.
pub struct ElementTable<'a> {
    pub name: &'a str,
    pub elements: &'a OrbitalElements,
    pub body: &'a CentralBody,
}

impl fmt::Display for ElementTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let el = self.elements;
        let rows = [
            ("Name", self.name.to_string()),
            ("Central body", self.body.name.to_string()),
            ("Perigee alt", format!("{:.3} km", el.perigee_altitude(self.body))),
            ("Apogee alt", format!("{:.3} km", el.apogee_altitude(self.body))),
            ("Semi-major axis", format!("{:.3} km", el.a())),
            ("Eccentricity", format!("{:.7}", el.e())),
            ("Inclination", format!("{:.4}°", el.i() * RAD2DEG)),
            ("RAAN", format!("{:.4}°", el.raan() * RAD2DEG)),
            ("Arg. perigee", format!("{:.4}°", el.aop() * RAD2DEG)),
            ("Mean anomaly", format!("{:.4}°", el.ma() * RAD2DEG)),
            ("Period", format!("{:.3} min", el.period(self.body.mu) / MINUTE)),
        ];

        writeln!(f, "--- Initial Keplerian elements ---")?;
        for (key, value) in rows {
            writeln!(f, "{key:<16}: {value}")?;
        }
        write!(f, "----------------------------------")
    }
}

/// Min/max envelope of one scalar series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc, x| match acc {
            None => Some(Range { min: x, max: x }),
            Some(r) => Some(Range {
                min: r.min.min(x),
                max: r.max.max(x),
            }),
        })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Summary statistics of a propagated series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    /// Last epoch offset (s)
    pub span: f64,
    pub altitude: Range,
    pub perigee_altitude: Range,
    pub speed: Range,
    /// max |e_recovered - e|
    pub max_eccentricity_deviation: f64,
    /// Samples whose deviation exceeds the consistency tolerance.
    pub inconsistent_samples: usize,
}

impl SeriesSummary {
    /// `None` for an empty (cancelled before the first sample) run.
    pub fn from_ephemeris(ephemeris: &Ephemeris, elements: &OrbitalElements) -> Option<Self> {
        let samples = ephemeris.samples();
        let last = samples.last()?;
        let deviation = |s: &PropagationSample| (s.eccentricity - elements.e()).abs();

        Some(SeriesSummary {
            samples: samples.len(),
            span: last.epoch,
            altitude: Range::of(samples.iter().map(|s| s.altitude))?,
            perigee_altitude: Range::of(samples.iter().map(|s| s.perigee_altitude))?,
            speed: Range::of(samples.iter().map(|s| s.speed))?,
            max_eccentricity_deviation: samples.iter().map(deviation).fold(0.0, f64::max),
            inconsistent_samples: samples
                .iter()
                .filter(|&s| deviation(s) > ECCENTRICITY_CHECK_TOLERANCE)
                .count(),
        })
    }
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples          : {} over {:.1} h", self.samples, self.span / 3600.0)?;
        writeln!(f, "Altitude         : {:.3} .. {:.3} km", self.altitude.min, self.altitude.max)?;
        writeln!(
            f,
            "Perigee altitude : {:.3} .. {:.3} km",
            self.perigee_altitude.min, self.perigee_altitude.max
        )?;
        writeln!(f, "Speed            : {:.4} .. {:.4} km/s", self.speed.min, self.speed.max)?;
        write!(
            f,
            "Ecc. consistency : max deviation {:.3e} ({} samples over tolerance)",
            self.max_eccentricity_deviation, self.inconsistent_samples
        )
    }
}

/// Elements echoed into the output document, angles in degrees.
#[derive(Debug, Clone, Serialize)]
pub struct ElementsRecord {
    pub a_km: f64,
    pub e: f64,
    pub inc_deg: f64,
    pub raan_deg: f64,
    pub aop_deg: f64,
    pub ma_deg: f64,
    pub period_s: f64,
}

impl ElementsRecord {
    pub fn new(elements: &OrbitalElements, body: &CentralBody) -> Self {
        ElementsRecord {
            a_km: elements.a(),
            e: elements.e(),
            inc_deg: elements.i() * RAD2DEG,
            raan_deg: elements.raan() * RAD2DEG,
            aop_deg: elements.aop() * RAD2DEG,
            ma_deg: elements.ma() * RAD2DEG,
            period_s: elements.period(body.mu),
        }
    }
}

/// JSON document handed to plotting/reporting tools.
#[derive(Debug, Serialize)]
pub struct EphemerisDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub satellite: &'a str,
    pub body: &'a CentralBody,
    pub elements: ElementsRecord,
    pub duration_s: f64,
    pub step_s: f64,
    pub status: RunStatus,
    pub summary: Option<SeriesSummary>,
    pub samples: &'a [PropagationSample],
}

impl<'a> EphemerisDocument<'a> {
    pub fn new(
        satellite: &'a str,
        elements: &OrbitalElements,
        body: &'a CentralBody,
        ephemeris: &'a Ephemeris,
    ) -> Self {
        EphemerisDocument {
            generated_at: Utc::now(),
            satellite,
            body,
            elements: ElementsRecord::new(elements, body),
            duration_s: ephemeris.grid().duration(),
            step_s: ephemeris.grid().step(),
            status: ephemeris.status(),
            summary: SeriesSummary::from_ephemeris(ephemeris, elements),
            samples: ephemeris.samples(),
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::EARTH;
    use crate::propagator::{propagate, CancellationToken, Propagator, RunOptions, TimeGrid};
    use approx::assert_relative_eq;

    fn leo1() -> OrbitalElements {
        OrbitalElements::from_apsides(
            423.0, 939.0, 0.0365331, 99.2936, 237.4020, 179.9420, 180.1886, &EARTH,
        )
        .unwrap()
    }

    #[test]
    fn test_element_table_lists_degrees() {
        let elems = leo1();
        let table = ElementTable { name: "LEO 1", elements: &elems, body: &EARTH }.to_string();
        assert!(table.contains("LEO 1"));
        assert!(table.contains("99.2936°"));
        assert!(table.contains("0.0365331"));
        assert!(table.contains("Period"));
    }

    #[test]
    fn test_summary_brackets_altitude_band() {
        let elems = leo1();
        let eph = propagate(&elems, &EARTH, 0.2 * SOLAR_DAY, 30.0).unwrap();
        let summary = SeriesSummary::from_ephemeris(&eph, &elems).unwrap();

        assert_eq!(summary.samples, 576);
        assert_relative_eq!(summary.span, 575.0 * 30.0);
        assert!(summary.altitude.min >= elems.perigee_altitude(&EARTH) - 1e-6);
        assert!(summary.altitude.max <= elems.apogee_altitude(&EARTH) + 1e-6);
        // Several orbits sampled every 30 s sweep most of the band.
        assert!(summary.altitude.span() > 0.95 * (elems.apogee_altitude(&EARTH) - elems.perigee_altitude(&EARTH)));
        assert!(summary.perigee_altitude.span() < 1e-6);
        assert_eq!(summary.inconsistent_samples, 0);
        assert!(summary.speed.min < summary.speed.max);
    }

    #[test]
    fn test_summary_absent_for_empty_run() {
        let elems = leo1();
        let token = CancellationToken::new();
        token.cancel();
        let eph = Propagator::new(elems, EARTH)
            .propagate_with(&TimeGrid::new(600.0, 60.0).unwrap(), &RunOptions::default().with_cancel(&token))
            .unwrap();
        assert!(SeriesSummary::from_ephemeris(&eph, &elems).is_none());
    }

    #[test]
    fn test_document_serializes_samples() {
        let elems = leo1();
        let eph = propagate(&elems, &EARTH, 300.0, 60.0).unwrap();
        let doc = EphemerisDocument::new("LEO 1", &elems, &EARTH, &eph);

        let mut buf = Vec::new();
        doc.write_json(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["satellite"], "LEO 1");
        let stamp = value["generated_at"].as_str().unwrap();
        assert_eq!(stamp.parse::<DateTime<Utc>>().unwrap(), doc.generated_at);
        assert_eq!(value["status"], "complete");
        assert_eq!(value["body"]["name"], "Earth");
        assert_eq!(value["samples"].as_array().unwrap().len(), 5);
        assert_eq!(value["samples"][1]["epoch"], 60.0);
        assert_eq!(value["samples"][0]["state"]["r"].as_array().unwrap().len(), 3);
        assert_relative_eq!(value["elements"]["inc_deg"].as_f64().unwrap(), 99.2936, epsilon = 1e-9);
    }
}
