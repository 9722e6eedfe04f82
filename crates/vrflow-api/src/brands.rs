//! Brand-ID lookup table for the gateway's `f=24` info endpoint.
//!
//! Vendor-assigned IDs; brand 255 is a simulator whose `proto` field
//! reports the simulated unit count instead of a protocol revision.

/// Resolve a manufacturer string from the brand/proto pair.
pub fn manufacturer(brand: u16, proto: u64) -> String {
    if brand == 255 {
        return format!("Simulator {proto} units");
    }
    brand_name(brand).unwrap_or("Unknown").to_owned()
}

/// Raw brand-ID table. `None` for IDs the vendor has not assigned.
pub fn brand_name(brand: u16) -> Option<&'static str> {
    let name = match brand {
        1 => "Hitachi",
        2 => "Daikin",
        3 => "Toshiba",
        4 => "Mitsubishi Heavy Industries",
        5 => "Mitsubishi Electric",
        6 => "Gree",
        7 => "Hisense",
        8 => "Midea",
        9 => "Haier",
        10 => "LG",
        13 => "Samsung",
        14 => "AUX",
        15 => "Panasonic",
        16 => "York",
        19 => "Gree 4th Gen",
        21 => "McQuay",
        24 => "TCL",
        25 => "Chigo",
        26 => "TICA",
        35 => "CH-York",
        36 => "CoolWind",
        37 => "York Qingdao",
        38 => "Fujitsu",
        39 => "Samsung (NotNASA_BMS)",
        40 => "Samsung (NASA_BMS)",
        42 => "Fudiwosi",
        43 => "B23",
        44 => "EK",
        45 => "Hitachi Q3 Converter",
        46 => "YCJ",
        47 => "Depulaite",
        48 => "Hailin A8033 Thermostat",
        49 => "Midea CoolWind (Special Protocol)",
        50 => "HITACHI Mini",
        56 => "HL8023MD Thermostat",
        58 => "Bole",
        59 => "Tianlang (Five Constant System)",
        101 => "CH-Emerson",
        102 => "CH-McQuay",
        103 => "Trane",
        104 => "CH-Carrier",
        105 => "CH-York (A1B1)",
        126 => "Toshiba (Central Control Address)",
        128 => "GREE_M",
        129 => "McQuay_M",
        131 => "Midea Modular",
        132 => "DUNAN_M",
        134 => "TICA Modular",
        135 => "Guoxiang_M",
        253 => "Mitsubishi Heavy Industries (KX4)",
        255 => "Simulator",
        381 => "Fujitsu Protocol Converter",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_brand_resolves() {
        assert_eq!(manufacturer(2, 0), "Daikin");
        assert_eq!(manufacturer(103, 4), "Trane");
    }

    #[test]
    fn unknown_brand_is_unknown() {
        assert_eq!(manufacturer(0, 0), "Unknown");
        assert_eq!(manufacturer(200, 0), "Unknown");
    }

    #[test]
    fn simulator_reports_unit_count() {
        assert_eq!(manufacturer(255, 16), "Simulator 16 units");
    }
}
