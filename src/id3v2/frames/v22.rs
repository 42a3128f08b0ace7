//! ID3v2.2 three-character frame IDs, mapped onto their ID3v2.3 equivalents
//! so the rest of the parser can treat every version uniformly.

const TABLE: &[(&str, &str)] = &[
    ("TT1", "TIT1"),
    ("TT2", "TIT2"),
    ("TT3", "TIT3"),
    ("TP1", "TPE1"),
    ("TP2", "TPE2"),
    ("TP3", "TPE3"),
    ("TP4", "TPE4"),
    ("TCM", "TCOM"),
    ("TXT", "TEXT"),
    ("TLA", "TLAN"),
    ("TCO", "TCON"),
    ("TAL", "TALB"),
    ("TPA", "TPOS"),
    ("TRK", "TRCK"),
    ("TRC", "TSRC"),
    ("TYE", "TYER"),
    ("TDA", "TDAT"),
    ("TIM", "TIME"),
    ("TRD", "TRDA"),
    ("TMT", "TMED"),
    ("TFT", "TFLT"),
    ("TBP", "TBPM"),
    ("TCR", "TCOP"),
    ("TPB", "TPUB"),
    ("TEN", "TENC"),
    ("TSS", "TSSE"),
    ("TLE", "TLEN"),
    ("TSI", "TSIZ"),
    ("TKE", "TKEY"),
    ("TOT", "TOAL"),
    ("TOF", "TOFN"),
    ("TOA", "TOPE"),
    ("TOL", "TOLY"),
    ("TDY", "TDLY"),
    ("TXX", "TXXX"),
    ("WAF", "WOAF"),
    ("WAR", "WOAR"),
    ("WAS", "WOAS"),
    ("WCM", "WCOM"),
    ("WCP", "WCOP"),
    ("WPB", "WPUB"),
    ("WXX", "WXXX"),
    ("IPL", "IPLS"),
    ("MCI", "MCDI"),
    ("ETC", "ETCO"),
    ("UFI", "UFID"),
    ("ULT", "USLT"),
    ("SLT", "SYLT"),
    ("COM", "COMM"),
    ("PIC", "APIC"),
    ("GEO", "GEOB"),
    ("CNT", "PCNT"),
    ("POP", "POPM"),
    ("REV", "RVRB"),
    ("BUF", "RBUF"),
    ("CRM", "ENCR"),
    ("LNK", "LINK"),
    ("POS", "POSS"),
    ("USR", "USER"),
    ("OWN", "OWNE"),
];

/// Returns the ID3v2.3 equivalent of a three-character ID3v2.2 frame ID. IDs
/// this crate doesn't have a mapping for are prefixed with `X` (the
/// convention ID3v2 itself uses for experimental frames) so they stay
/// four characters and distinguishable from one another, and are preserved
/// opaquely by [`crate::id3v2::frames::RawFrame`].
pub(crate) fn upgrade(id: &str) -> String {
    TABLE
        .iter()
        .find(|&&(v22, _)| v22 == id)
        .map(|&(_, v23)| v23.to_string())
        .unwrap_or_else(|| format!("X{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrades_known_ids() {
        assert_eq!(upgrade("TT2"), "TIT2");
        assert_eq!(upgrade("PIC"), "APIC");
        assert_eq!(upgrade("COM"), "COMM");
    }

    #[test]
    fn falls_back_on_unknown_ids() {
        assert_eq!(upgrade("ZZZ"), "XZZZ");
    }
}
