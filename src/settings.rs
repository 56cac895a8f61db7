//! Parameter names accepted by the API and formatting defaults for the data it returns.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Names a closed set of values by the `descricao` the API uses for them.
pub trait Described: Sized + Copy + 'static {
    /// Every accepted value, in declaration order.
    const ALL: &'static [Self];
    /// Reference list endpoint holding the ids of these values.
    const ENDPOINT: &'static str;

    fn descricao(self) -> &'static str;
}

fn parse_described<T: Described>(s: &str, kind: &'static str) -> Result<T, UnknownName> {
    T::ALL
        .iter()
        .copied()
        .find(|v| v.descricao() == s)
        .ok_or_else(|| UnknownName {
            kind,
            name: s.to_string(),
        })
}

/// A name outside one of the closed enumerations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {name:?}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

macro_rules! described_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $endpoint:literal {
            $($variant:ident => $descricao:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Described for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];
            const ENDPOINT: &'static str = $endpoint;

            fn descricao(self) -> &'static str {
                match self {
                    $(Self::$variant => $descricao),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.descricao())
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_described(s, $kind)
            }
        }
    };
}

described_enum! {
    /// Time aggregation of a series.
    Mode, "mode", "/v2/valoresParametros/modos" {
        Daily => "Diário",
        Monthly => "Mensal",
    }
}

described_enum! {
    /// Source of the precipitation field feeding a forecast.
    PrecipitationSource, "precipitation source", "/v2/valoresParametros/mapas" {
        Merge => "MERGE",
        Eta => "ETA",
        Gefs => "GEFS",
        Cfs => "CFS",
        User => "Usuário",
        ZeroPrecipitation => "Prec. Zero",
        EcmwfEns => "ECMWF_ENS",
        EcmwfEnsExt => "ECMWF_ENS_EXT",
        Ons => "ONS",
        OnsPluvia => "ONS_Pluvia",
        OnsEtad1Pluvia => "ONS_ETAd_1_Pluvia",
        GefsExt => "GEFS_EXT",
    }
}

described_enum! {
    /// Inflow forecast model.
    ForecastModel, "forecast model", "/v2/valoresParametros/modelos" {
        Ia => "IA",
        IaSmap => "IA+SMAP",
        Smap => "SMAP",
    }
}

/// Result files that can be downloaded for a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Vna,
    Prevs,
    Dadvaz,
    PMedia,
    Ena,
    EnaPrevs,
    Str,
}

impl FileKind {
    pub const ALL: &'static [FileKind] = &[
        FileKind::Vna,
        FileKind::Prevs,
        FileKind::Dadvaz,
        FileKind::PMedia,
        FileKind::Ena,
        FileKind::EnaPrevs,
        FileKind::Str,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Vna => "VNA",
            FileKind::Prevs => "Prevs",
            FileKind::Dadvaz => "Dadvaz",
            FileKind::PMedia => "PMedia",
            FileKind::Ena => "ENA",
            FileKind::EnaPrevs => "ENAPREVS",
            FileKind::Str => "STR",
        }
    }

    /// Kind of a downloaded file, judged by its name up to the first `.` or `_`
    /// (`VNA.zip`, `enaprevs_202403.csv`).
    pub fn from_file_name(name: &str) -> Option<FileKind> {
        let stem = name.split(['.', '_']).next().unwrap_or(name);
        FileKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(stem))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "file kind",
                name: s.to_string(),
            })
    }
}

/// Formatting used when fetched data is written out as delimited text.
///
/// Not consumed by the client itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDefaults {
    pub sep: String,
    pub decimal: String,
    pub encoding: String,
    pub date_format: String,
    pub round_float: u32,
}

impl Default for FormatDefaults {
    fn default() -> Self {
        Self {
            sep: ";".to_string(),
            decimal: ".".to_string(),
            encoding: "utf8".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            round_float: 3,
        }
    }
}

impl FormatDefaults {
    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    /// Rounds to `round_float` places and renders with the configured decimal mark.
    pub fn format_float(&self, value: f64) -> String {
        let s = format!("{:.*}", self.round_float as usize, self.round(value));
        if self.decimal == "." {
            s
        } else {
            s.replace('.', &self.decimal)
        }
    }

    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.round_float as i32);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_api_descriptions() {
        assert_eq!(Mode::Daily.to_string(), "Diário");
        assert_eq!("Mensal".parse::<Mode>().unwrap(), Mode::Monthly);
        assert_eq!(
            "Prec. Zero".parse::<PrecipitationSource>().unwrap(),
            PrecipitationSource::ZeroPrecipitation
        );
        assert_eq!(
            "IA+SMAP".parse::<ForecastModel>().unwrap(),
            ForecastModel::IaSmap
        );
        assert_eq!(PrecipitationSource::ALL.len(), 12);
        assert_eq!(ForecastModel::ALL.len(), 3);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "Weekly".parse::<Mode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown mode: \"Weekly\"");
        assert!("merge".parse::<PrecipitationSource>().is_err());
        assert!("ENAPREV".parse::<FileKind>().is_err());
    }

    #[test]
    fn endpoints() {
        assert_eq!(Mode::ENDPOINT, "/v2/valoresParametros/modos");
        assert_eq!(PrecipitationSource::ENDPOINT, "/v2/valoresParametros/mapas");
        assert_eq!(ForecastModel::ENDPOINT, "/v2/valoresParametros/modelos");
    }

    #[test]
    fn file_kinds_round_trip_names() {
        for kind in FileKind::ALL {
            assert_eq!(kind.as_str().parse::<FileKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn file_kind_from_downloaded_name() {
        assert_eq!(FileKind::from_file_name("VNA.zip"), Some(FileKind::Vna));
        assert_eq!(
            FileKind::from_file_name("enaprevs_202403.csv"),
            Some(FileKind::EnaPrevs)
        );
        assert_eq!(FileKind::from_file_name("ENA.csv"), Some(FileKind::Ena));
        assert_eq!(FileKind::from_file_name("relatorio.pdf"), None);
    }

    #[test]
    fn format_defaults() {
        let fmt = FormatDefaults::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(fmt.format_date(date), "2024-03-01");
        assert_eq!(fmt.round(1.23456), 1.235);
        assert_eq!(fmt.format_float(2.5), "2.500");

        let br = FormatDefaults {
            decimal: ",".to_string(),
            ..FormatDefaults::default()
        };
        assert_eq!(br.format_float(1.23456), "1,235");
    }
}
