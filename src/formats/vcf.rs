//! VCF output
//!
//! Writes the VCF 4.2 header and renders variant calls as data lines, on
//! the reference assembly ([`VcfRecord::from_call`]) or on the target
//! assembly ([`VcfRecord::target_from_call`]). The other assembly's
//! coordinates travel in the INFO column (`TARGET_CHROM`, `TARGET_POS`)
//! next to `CHAIN_ID` and `STRAND`. Large calls use symbolic alleles with
//! `END`, `SVTYPE` and `SVLEN`.

use crate::core::{Allele, VariantCall};
use std::fmt;
use std::io::{self, Write};

const INFO_HEADERS: &[&str] = &[
    r#"##INFO=<ID=TARGET_CHROM,Number=1,Type=String,Description="Target sequence chromosome">"#,
    r#"##INFO=<ID=TARGET_POS,Number=1,Type=Integer,Description="Target sequence position">"#,
    r#"##INFO=<ID=END,Number=1,Type=Integer,Description="End position of the variant described in this record">"#,
    r#"##INFO=<ID=SVTYPE,Number=1,Type=String,Description="Type of structural variant">"#,
    r#"##INFO=<ID=SVLEN,Number=.,Type=Integer,Description="Difference in length between REF and ALT alleles">"#,
    r#"##INFO=<ID=CHAIN_ID,Number=1,Type=String,Description="ID of the chain the record was called from">"#,
    r#"##INFO=<ID=STRAND,Number=1,Type=String,Description="Target strand of the chain">"#,
];

const ALT_HEADERS: &[&str] = &[
    r#"##ALT=<ID=DEL,Description="Deletion">"#,
    r#"##ALT=<ID=INS,Description="Insertion of novel sequence">"#,
    r#"##ALT=<ID=INDEL,Description="Deletion and Insertion of novel sequence">"#,
];

/// Write the meta-information lines and the column header
///
/// `contigs` lists the sequences of the assembly the records are placed
/// on, with their lengths.
pub fn write_header<W: Write + ?Sized>(
    writer: &mut W,
    contigs: &[(String, u64)],
    reference: Option<&str>,
) -> io::Result<()> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    for line in INFO_HEADERS.iter().chain(ALT_HEADERS) {
        writeln!(writer, "{}", line)?;
    }
    if let Some(reference) = reference {
        writeln!(writer, "##reference={}", reference)?;
    }
    for (name, length) in contigs {
        writeln!(writer, "##contig=<ID={},length={}>", name, length)?;
    }
    writeln!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")
}

/// One VCF data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    pub alternate: String,
    pub info: Vec<(&'static str, String)>,
}

impl VcfRecord {
    /// Record on the reference assembly
    pub fn from_call(call: &VariantCall) -> Self {
        let mut info = vec![
            ("TARGET_CHROM", call.target_name.clone()),
            ("TARGET_POS", (call.target_pos + 1).to_string()),
        ];

        let (reference, alternate) = match &call.structural {
            Some(sv) => {
                info.push(("END", sv.end.to_string()));
                info.push(("SVTYPE", sv.sv_type.to_string()));
                info.push(("SVLEN", sv.sv_length.to_string()));
                (sv.sv_ref.to_string(), format!("<{}>", sv.sv_type))
            }
            None => (call.reference_allele.to_string(), call.target_allele.to_string()),
        };
        push_chain_info(&mut info, call);

        Self {
            chrom: call.reference_name.clone(),
            pos: call.reference_pos,
            reference,
            alternate,
            info,
        }
    }

    /// Record on the target assembly
    ///
    /// Alleles are written on the target's plus strand (reverse-complemented
    /// for minus-strand chains) and symbolic types are mirrored, so an
    /// insertion into the target is a deletion from it.
    pub fn target_from_call(call: &VariantCall) -> Self {
        let oriented = |allele: &Allele| {
            if call.target_strand.is_minus() {
                allele.reverse_complement()
            } else {
                allele.clone()
            }
        };
        let mut info = vec![
            ("TARGET_CHROM", call.reference_name.clone()),
            ("TARGET_POS", call.reference_pos.to_string()),
        ];

        let (reference, alternate) = match &call.structural {
            Some(sv) => {
                let sv_type = sv.sv_type.mirrored();
                let end = call.target_end.unwrap_or(call.target_pos + 1);
                info.push(("END", end.to_string()));
                info.push(("SVTYPE", sv_type.to_string()));
                info.push(("SVLEN", (-sv.sv_length).to_string()));
                (sv.target_sv_ref.to_string(), format!("<{}>", sv_type))
            }
            None => (
                oriented(&call.target_allele).to_string(),
                oriented(&call.reference_allele).to_string(),
            ),
        };
        push_chain_info(&mut info, call);

        Self {
            chrom: call.target_name.clone(),
            pos: call.target_pos + 1,
            reference,
            alternate,
            info,
        }
    }
}

fn push_chain_info(info: &mut Vec<(&'static str, String)>, call: &VariantCall) {
    info.push(("CHAIN_ID", call.chain_id.clone()));
    info.push(("STRAND", call.target_strand.to_string()));
}

impl fmt::Display for VcfRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t.\t{}\t{}\t.\t.\t",
            self.chrom, self.pos, self.reference, self.alternate
        )?;
        for (i, (key, value)) in self.info.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}
