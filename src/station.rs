use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Process steps of the line. Each one writes its own group of columns
/// into the test log export, all sharing the same prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Station {
    Pcb,
    Fw,
    RfTx,
    SemiAssy,
    Batadc,
}

impl Station {
    pub const ALL: [Station; 5] = [
        Station::Pcb,
        Station::Fw,
        Station::RfTx,
        Station::SemiAssy,
        Station::Batadc,
    ];

    /// Column prefix in the CSV export
    pub fn prefix(&self) -> &'static str {
        match self {
            Station::Pcb => "Pcb",
            Station::Fw => "Fw",
            Station::RfTx => "RfTx",
            Station::SemiAssy => "SemiAssy",
            Station::Batadc => "Batadc",
        }
    }

    /// Value stored in the `station` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Station::Pcb => "pcb",
            Station::Fw => "fw",
            Station::RfTx => "rftx",
            Station::SemiAssy => "semi",
            Station::Batadc => "batadc",
        }
    }

    pub fn column(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix(), suffix)
    }

    pub fn pass_column(&self) -> String {
        self.column("Pass")
    }

    pub fn pc_column(&self) -> String {
        self.column("PC")
    }

    /// Columns that hold when the test ran, most precise first
    pub fn time_columns(&self) -> [String; 2] {
        [self.column("StartTime"), self.column("Stamp")]
    }

    pub fn stop_column(&self) -> String {
        self.column("StopTime")
    }

    pub fn min_column(&self, item: &str) -> String {
        self.column(&format!("Min{item}"))
    }

    pub fn max_column(&self, item: &str) -> String {
        self.column(&format!("Max{item}"))
    }

    /// Columns of this station that are bookkeeping, not measurements
    pub fn is_reserved(&self, column: &str) -> bool {
        let Some(rest) = column.strip_prefix(self.prefix()) else {
            return false;
        };
        matches!(rest, "Pass" | "PC" | "StartTime" | "StopTime" | "Stamp")
            || rest.starts_with("Min")
            || rest.starts_with("Max")
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Station {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcb" => Ok(Station::Pcb),
            "fw" | "firmware" => Ok(Station::Fw),
            "rftx" | "rf" => Ok(Station::RfTx),
            "semi" | "semiassy" => Ok(Station::SemiAssy),
            "batadc" | "func" => Ok(Station::Batadc),
            _ => Err(Error::UnknownStation(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_follow_prefix() {
        assert_eq!(Station::Pcb.pass_column(), "PcbPass");
        assert_eq!(Station::RfTx.pc_column(), "RfTxPC");
        assert_eq!(Station::Pcb.min_column("IrCurr"), "PcbMinIrCurr");
        assert_eq!(Station::SemiAssy.time_columns()[0], "SemiAssyStartTime");
    }

    #[test]
    fn reserved_columns_are_not_items() {
        assert!(Station::Pcb.is_reserved("PcbPass"));
        assert!(Station::Pcb.is_reserved("PcbMaxLed"));
        assert!(!Station::Pcb.is_reserved("PcbLed"));
        assert!(!Station::Fw.is_reserved("PcbPass"));
    }

    #[test]
    fn parses_labels_and_aliases() {
        assert_eq!("PCB".parse::<Station>().unwrap(), Station::Pcb);
        assert_eq!("func".parse::<Station>().unwrap(), Station::Batadc);
        assert!("oven".parse::<Station>().is_err());
        for station in Station::ALL {
            assert_eq!(station.as_str().parse::<Station>().unwrap(), station);
        }
    }
}
