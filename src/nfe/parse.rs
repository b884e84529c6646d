use std::str::FromStr;

use chrono::DateTime;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::NFE_NAMESPACE;
use crate::core::*;

/// Parse an NF-e document (`nfeProc` or bare `NFe`) into an [`Invoice`].
///
/// Fails with [`RtcError::MalformedDocument`] when the bytes are not
/// well-formed XML and with [`RtcError::UnsupportedLayout`] when the XML is
/// not an NF-e 4.00 document. Numeric tags with unreadable text do not fail
/// the extraction; they are left absent and listed in
/// [`Invoice::invalid_fields`].
pub fn from_nfe_xml(xml: &[u8]) -> Result<Invoice, RtcError> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| RtcError::MalformedDocument(format!("document is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut p = NfeParsed::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e)?;
                p.open(&path, &name, e)?;
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e)?;
                p.open(&path, &name, e)?;
                p.close(&name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| RtcError::MalformedDocument(format!("bad text content: {e}")))?;
                if text.is_empty() {
                    continue;
                }
                if path.is_empty() {
                    return Err(RtcError::MalformedDocument(
                        "text outside the root element".into(),
                    ));
                }
                p.handle_text(&path, &text);
            }
            Ok(Event::CData(ref e)) => {
                if path.is_empty() {
                    return Err(RtcError::MalformedDocument(
                        "CDATA outside the root element".into(),
                    ));
                }
                let text = String::from_utf8_lossy(&**e);
                let text = text.trim();
                if !text.is_empty() {
                    p.handle_text(&path, text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().ok_or_else(|| {
                    RtcError::MalformedDocument("closing tag without an open element".into())
                })?;
                p.close(&ended);
            }
            Ok(Event::Eof) => {
                if let Some(open) = path.last() {
                    return Err(RtcError::MalformedDocument(format!(
                        "unexpected end of document inside <{open}>"
                    )));
                }
                break;
            }
            Err(e) => {
                return Err(RtcError::MalformedDocument(format!(
                    "XML parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    p.into_invoice()
}

fn local_name(e: &BytesStart<'_>) -> Result<String, RtcError> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|_| RtcError::MalformedDocument("element name is not valid UTF-8".into()))
}

/// Attributes of an element as (qualified key, unescaped value) pairs.
fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, RtcError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr =
            attr.map_err(|e| RtcError::MalformedDocument(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| RtcError::MalformedDocument(format!("bad attribute value: {e}")))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| !k.starts_with("xmlns") && k.rsplit(':').next() == Some(name))
        .map(|(_, v)| v.as_str())
}

fn position(path: &[String], name: &str) -> Option<usize> {
    path.iter().position(|p| p == name)
}

// ---------------------------------------------------------------------------
// Raw (string) capture
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NfeParsed {
    root: Option<String>,
    namespace_declared: bool,
    inf_nfe_seen: bool,

    access_key: Option<String>,
    layout_version: Option<String>,
    model: Option<String>,
    series: Option<String>,
    number: Option<String>,
    issued_at: Option<String>,
    environment: Option<String>,

    issuer: PartyParsed,
    recipient: PartyParsed,

    items: Vec<ItemParsed>,
    current_item: Option<ItemParsed>,

    totals: TotalsParsed,
}

#[derive(Default)]
struct PartyParsed {
    cnpj: Option<String>,
    cpf: Option<String>,
    ie: Option<String>,
    name: Option<String>,
    uf: Option<String>,
    ind_ie_dest: Option<String>,
}

#[derive(Default)]
struct ItemParsed {
    n_item: Option<String>,
    product_code: Option<String>,
    description: Option<String>,
    ncm: Option<String>,
    cfop: Option<String>,
    v_prod: Option<String>,
    v_frete: Option<String>,
    v_seg: Option<String>,
    v_desc: Option<String>,
    v_outro: Option<String>,
    icms: Option<TaxParsed>,
    pis: Option<TaxParsed>,
    cofins: Option<TaxParsed>,
    ipi: Option<TaxParsed>,
    ibs_cbs: Option<IbsCbsParsed>,
}

impl ItemParsed {
    fn family(&mut self, family: &str) -> Option<&mut Option<TaxParsed>> {
        match family {
            "ICMS" => Some(&mut self.icms),
            "PIS" => Some(&mut self.pis),
            "COFINS" => Some(&mut self.cofins),
            "IPI" => Some(&mut self.ipi),
            _ => None,
        }
    }
}

#[derive(Default)]
struct TaxParsed {
    group: String,
    cst: Option<String>,
    base: Option<String>,
    rate: Option<String>,
    value: Option<String>,
}

#[derive(Default)]
struct IbsCbsParsed {
    cst: Option<String>,
    class_code: Option<String>,
    base: Option<String>,
    p_ibs_uf: Option<String>,
    v_ibs_uf: Option<String>,
    p_ibs_mun: Option<String>,
    v_ibs_mun: Option<String>,
    v_ibs: Option<String>,
    p_cbs: Option<String>,
    v_cbs: Option<String>,
}

#[derive(Default)]
struct TotalsParsed {
    v_bc: Option<String>,
    v_icms: Option<String>,
    v_prod: Option<String>,
    v_ipi: Option<String>,
    v_pis: Option<String>,
    v_cofins: Option<String>,
    v_nf: Option<String>,
    v_bc_ibs_cbs: Option<String>,
    v_ibs: Option<String>,
    v_cbs: Option<String>,
}

impl NfeParsed {
    /// Element opened under `path` (which does not include it yet).
    fn open(&mut self, path: &[String], name: &str, e: &BytesStart<'_>) -> Result<(), RtcError> {
        if path.is_empty() {
            if let Some(root) = &self.root {
                return Err(RtcError::MalformedDocument(format!(
                    "second root element <{name}> after <{root}>"
                )));
            }
            self.root = Some(name.to_string());
        }

        match name {
            "nfeProc" | "NFe" => {
                let attrs = attributes(e)?;
                if attrs
                    .iter()
                    .any(|(k, v)| (k == "xmlns" || k.starts_with("xmlns:")) && v == NFE_NAMESPACE)
                {
                    self.namespace_declared = true;
                }
            }
            "infNFe" => {
                let attrs = attributes(e)?;
                self.inf_nfe_seen = true;
                self.access_key = attr(&attrs, "Id").map(str::to_string);
                self.layout_version = attr(&attrs, "versao").map(str::to_string);
            }
            "det" => {
                let attrs = attributes(e)?;
                self.current_item = Some(ItemParsed {
                    n_item: attr(&attrs, "nItem").map(str::to_string),
                    ..Default::default()
                });
            }
            _ => {}
        }

        let Some(item) = self.current_item.as_mut() else {
            return Ok(());
        };
        let parent = path.last().map(String::as_str).unwrap_or("");
        let grandparent = path
            .len()
            .checked_sub(2)
            .map(|i| path[i].as_str())
            .unwrap_or("");

        if grandparent == "imposto" {
            // First concrete group of each family (e.g. ICMS00, PISAliq).
            let is_group = match parent {
                "ICMS" | "PIS" | "COFINS" => true,
                "IPI" => matches!(name, "IPITrib" | "IPINT"),
                _ => false,
            };
            if is_group {
                if let Some(slot) = item.family(parent) {
                    if slot.is_none() {
                        *slot = Some(TaxParsed {
                            group: name.to_string(),
                            ..Default::default()
                        });
                    }
                }
            }
        }
        if name == "IBSCBS" && parent == "imposto" && item.ibs_cbs.is_none() {
            item.ibs_cbs = Some(IbsCbsParsed::default());
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        if name == "det" {
            if let Some(item) = self.current_item.take() {
                self.items.push(item);
            }
        }
    }

    fn handle_text(&mut self, path: &[String], text: &str) {
        let leaf = path.last().map(|s| s.as_str()).unwrap_or("");
        let parent = if path.len() >= 2 {
            path[path.len() - 2].as_str()
        } else {
            ""
        };
        let value = Some(text.to_string());

        // Identification
        if parent == "ide" {
            match leaf {
                "mod" => self.model = value,
                "serie" => self.series = value,
                "nNF" => self.number = value,
                "dhEmi" => self.issued_at = value,
                "tpAmb" => self.environment = value,
                _ => {}
            }
            return;
        }

        // Parties
        let party = match parent {
            "emit" | "enderEmit" => Some(&mut self.issuer),
            "dest" | "enderDest" => Some(&mut self.recipient),
            _ => None,
        };
        if let Some(party) = party {
            let in_address = parent.starts_with("ender");
            match (in_address, leaf) {
                (false, "CNPJ") => party.cnpj = value,
                (false, "CPF") => party.cpf = value,
                (false, "IE") => party.ie = value,
                (false, "xNome") => party.name = value,
                (false, "indIEDest") => party.ind_ie_dest = value,
                (true, "UF") => party.uf = value,
                _ => {}
            }
            return;
        }

        // Items
        if let Some(item) = self.current_item.as_mut() {
            if parent == "prod" {
                match leaf {
                    "cProd" => item.product_code = value,
                    "xProd" => item.description = value,
                    "NCM" => item.ncm = value,
                    "CFOP" => item.cfop = value,
                    "vProd" => item.v_prod = value,
                    "vFrete" => item.v_frete = value,
                    "vSeg" => item.v_seg = value,
                    "vDesc" => item.v_desc = value,
                    "vOutro" => item.v_outro = value,
                    _ => {}
                }
                return;
            }
            let Some(imp) = position(path, "imposto") else {
                return;
            };
            let rel: Vec<&str> = path[imp + 1..].iter().map(String::as_str).collect();
            match rel.as_slice() {
                ["IBSCBS", rest @ ..] => {
                    let Some(g) = item.ibs_cbs.as_mut() else {
                        return;
                    };
                    match rest {
                        ["CST"] => g.cst = value,
                        ["cClassTrib"] => g.class_code = value,
                        ["gIBSCBS", "vBC"] => g.base = value,
                        ["gIBSCBS", "gIBSUF", "pIBSUF"] => g.p_ibs_uf = value,
                        ["gIBSCBS", "gIBSUF", "vIBSUF"] => g.v_ibs_uf = value,
                        ["gIBSCBS", "gIBSMun", "pIBSMun"] => g.p_ibs_mun = value,
                        ["gIBSCBS", "gIBSMun", "vIBSMun"] => g.v_ibs_mun = value,
                        ["gIBSCBS", "vIBS"] => g.v_ibs = value,
                        ["gIBSCBS", "gCBS", "pCBS"] => g.p_cbs = value,
                        ["gIBSCBS", "gCBS", "vCBS"] => g.v_cbs = value,
                        _ => {}
                    }
                }
                [family, group, tag] => {
                    let Some(Some(tax)) = item.family(family) else {
                        return;
                    };
                    if tax.group != *group {
                        return;
                    }
                    let rate_tag = format!("p{family}");
                    let value_tag = format!("v{family}");
                    match *tag {
                        "CST" | "CSOSN" => tax.cst = value,
                        "vBC" => tax.base = value,
                        t if t == rate_tag => tax.rate = value,
                        t if t == value_tag => tax.value = value,
                        _ => {}
                    }
                }
                _ => {}
            }
            return;
        }

        // Totals
        if let Some(tot) = position(path, "total") {
            let rel: Vec<&str> = path[tot + 1..].iter().map(String::as_str).collect();
            let t = &mut self.totals;
            match rel.as_slice() {
                ["ICMSTot", "vBC"] => t.v_bc = value,
                ["ICMSTot", "vICMS"] => t.v_icms = value,
                ["ICMSTot", "vProd"] => t.v_prod = value,
                ["ICMSTot", "vIPI"] => t.v_ipi = value,
                ["ICMSTot", "vPIS"] => t.v_pis = value,
                ["ICMSTot", "vCOFINS"] => t.v_cofins = value,
                ["ICMSTot", "vNF"] => t.v_nf = value,
                ["IBSCBSTot", "vBCIBSCBS"] => t.v_bc_ibs_cbs = value,
                ["IBSCBSTot", "gIBS", "vIBS"] => t.v_ibs = value,
                ["IBSCBSTot", "gCBS", "vCBS"] => t.v_cbs = value,
                _ => {}
            }
        }
    }

    fn check_layout(&self) -> Result<(), RtcError> {
        let root = self
            .root
            .as_deref()
            .ok_or_else(|| RtcError::MalformedDocument("empty document".into()))?;
        if root != "nfeProc" && root != "NFe" {
            return Err(RtcError::UnsupportedLayout(format!(
                "root element <{root}> is neither nfeProc nor NFe"
            )));
        }
        if !self.namespace_declared {
            return Err(RtcError::UnsupportedLayout(format!(
                "<{root}> does not declare the namespace {NFE_NAMESPACE}"
            )));
        }
        if !self.inf_nfe_seen {
            return Err(RtcError::UnsupportedLayout("no infNFe element".into()));
        }
        let version = self
            .layout_version
            .as_deref()
            .ok_or_else(|| RtcError::UnsupportedLayout("infNFe has no versao attribute".into()))?;
        match Decimal::from_str(version.trim()) {
            Ok(v) if v >= Decimal::new(400, 2) => Ok(()),
            _ => Err(RtcError::UnsupportedLayout(format!(
                "layout version {version} is older than 4.00"
            ))),
        }
    }

    fn into_invoice(self) -> Result<Invoice, RtcError> {
        self.check_layout()?;

        let mut invalid = Vec::new();

        let issued_at = self.issued_at.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|e| debug!(raw, error = %e, "dhEmi is not an RFC 3339 timestamp"))
                .ok()
        });

        let header = Header {
            access_key: self.access_key,
            layout_version: self.layout_version,
            model: self.model,
            series: self.series,
            number: self.number,
            issued_at,
            environment: self.environment,
        };

        let mut items = Vec::with_capacity(self.items.len());
        for (index, raw) in self.items.into_iter().enumerate() {
            items.push(raw.into_line_item(index, &mut invalid));
        }

        let t = self.totals;
        let mut doc = Amounts {
            item: None,
            invalid: &mut invalid,
        };
        let totals = DocumentTotals {
            icms_base: doc.read("ICMSTot/vBC", t.v_bc),
            icms: doc.read("ICMSTot/vICMS", t.v_icms),
            products: doc.read("ICMSTot/vProd", t.v_prod),
            ipi: doc.read("ICMSTot/vIPI", t.v_ipi),
            pis: doc.read("ICMSTot/vPIS", t.v_pis),
            cofins: doc.read("ICMSTot/vCOFINS", t.v_cofins),
            invoice: doc.read("ICMSTot/vNF", t.v_nf),
            ibs_cbs_base: doc.read("IBSCBSTot/vBCIBSCBS", t.v_bc_ibs_cbs),
            ibs: doc.read("IBSCBSTot/gIBS/vIBS", t.v_ibs),
            cbs: doc.read("IBSCBSTot/gCBS/vCBS", t.v_cbs),
        };

        if !invalid.is_empty() {
            warn!(count = invalid.len(), "unreadable numeric fields");
        }
        debug!(items = items.len(), "parsed NF-e structure");

        Ok(Invoice {
            header,
            issuer: self.issuer.into_party(),
            recipient: self.recipient.into_party(),
            items,
            totals,
            invalid_fields: invalid,
        })
    }
}

impl PartyParsed {
    fn into_party(self) -> Party {
        Party {
            cnpj: self.cnpj,
            cpf: self.cpf,
            state_registration: self.ie,
            name: self.name,
            uf: self.uf,
            ie_indicator: self.ind_ie_dest,
        }
    }
}

impl ItemParsed {
    fn into_line_item(self, index: usize, invalid: &mut Vec<InvalidField>) -> LineItem {
        let fallback = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let number = match self.n_item.as_deref().map(|n| n.trim().parse::<u32>()) {
            Some(Ok(n)) => n,
            _ => {
                warn!(position = fallback, raw = ?self.n_item, "det without a usable nItem");
                fallback
            }
        };

        let mut a = Amounts {
            item: Some(number),
            invalid,
        };
        let values = ItemValues {
            product: a.read("prod/vProd", self.v_prod),
            freight: a.read("prod/vFrete", self.v_frete),
            insurance: a.read("prod/vSeg", self.v_seg),
            discount: a.read("prod/vDesc", self.v_desc),
            other: a.read("prod/vOutro", self.v_outro),
        };
        let icms = self.icms.map(|t| a.classic("ICMS", t));
        let pis = self.pis.map(|t| a.classic("PIS", t));
        let cofins = self.cofins.map(|t| a.classic("COFINS", t));
        let ipi = self.ipi.map(|t| a.classic("IPI", t));
        let ibs_cbs = self.ibs_cbs.map(|g| IbsCbs {
            cst: g.cst,
            class_code: g.class_code,
            base: a.read("IBSCBS/gIBSCBS/vBC", g.base),
            ibs_state_rate: a.read("IBSCBS/gIBSCBS/gIBSUF/pIBSUF", g.p_ibs_uf),
            ibs_state_value: a.read("IBSCBS/gIBSCBS/gIBSUF/vIBSUF", g.v_ibs_uf),
            ibs_municipal_rate: a.read("IBSCBS/gIBSCBS/gIBSMun/pIBSMun", g.p_ibs_mun),
            ibs_municipal_value: a.read("IBSCBS/gIBSCBS/gIBSMun/vIBSMun", g.v_ibs_mun),
            ibs_value: a.read("IBSCBS/gIBSCBS/vIBS", g.v_ibs),
            cbs_rate: a.read("IBSCBS/gIBSCBS/gCBS/pCBS", g.p_cbs),
            cbs_value: a.read("IBSCBS/gIBSCBS/gCBS/vCBS", g.v_cbs),
        });

        LineItem {
            number,
            product_code: self.product_code,
            description: self.description,
            ncm: self.ncm,
            cfop: self.cfop,
            values,
            icms,
            pis,
            cofins,
            ipi,
            ibs_cbs,
        }
    }
}

/// Decimal conversion that records unreadable text instead of failing.
struct Amounts<'a> {
    item: Option<u32>,
    invalid: &'a mut Vec<InvalidField>,
}

impl Amounts<'_> {
    fn read(&mut self, path: &str, raw: Option<String>) -> Option<Decimal> {
        let raw = raw?;
        match parse_decimal(&raw) {
            Some(d) => Some(d),
            None => {
                self.invalid.push(InvalidField {
                    item: self.item,
                    path: path.to_string(),
                    raw,
                });
                None
            }
        }
    }

    fn classic(&mut self, family: &str, t: TaxParsed) -> ClassicTax {
        let prefix = format!("{family}/{}", t.group);
        ClassicTax {
            base: self.read(&format!("{prefix}/vBC"), t.base),
            rate: self.read(&format!("{prefix}/p{family}"), t.rate),
            value: self.read(&format!("{prefix}/v{family}"), t.value),
            cst: t.cst,
            group: t.group,
        }
    }
}

/// Widest integer part of any NF-e `TDec` type.
const MAX_INT_DIGITS: usize = 13;
/// Widest fraction of any NF-e `TDec` type.
const MAX_FRAC_DIGITS: usize = 10;

/// NF-e decimals: optional sign, up to 13 digits, optional `.` and up to
/// 10 fraction digits. Anything wider is outside every `TDec` type.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut parts = digits.splitn(2, '.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next();
    let all_digits = |p: &str, max: usize| {
        !p.is_empty() && p.len() <= max && p.bytes().all(|b| b.is_ascii_digit())
    };
    if !all_digits(int, MAX_INT_DIGITS) || frac.is_some_and(|f| !all_digits(f, MAX_FRAC_DIGITS)) {
        return None;
    }
    Decimal::from_str(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn nfe(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<NFe xmlns="http://www.portalfiscal.inf.br/nfe">
  <infNFe versao="4.00" Id="NFe35250112345678000195550010000001231000001234">{body}</infNFe>
</NFe>"#
        )
    }

    const ITEM: &str = r#"
<det nItem="1">
  <prod>
    <cProd>A-1</cProd><xProd>Parafuso</xProd><NCM>73181500</NCM><CFOP>5102</CFOP>
    <vProd>1000.00</vProd><vFrete>10.00</vFrete>
  </prod>
  <imposto>
    <ICMS><ICMS00><orig>0</orig><CST>00</CST><vBC>1000.00</vBC><pICMS>18.00</pICMS><vICMS>180.00</vICMS></ICMS00></ICMS>
    <IPI><cEnq>999</cEnq><IPITrib><CST>50</CST><vBC>1000.00</vBC><pIPI>5.00</pIPI><vIPI>50.00</vIPI></IPITrib></IPI>
    <PIS><PISAliq><CST>01</CST><vBC>1000.00</vBC><pPIS>1.65</pPIS><vPIS>16.50</vPIS></PISAliq></PIS>
    <COFINS><COFINSAliq><CST>01</CST><vBC>1000.00</vBC><pCOFINS>7.60</pCOFINS><vCOFINS>76.00</vCOFINS></COFINSAliq></COFINS>
    <IBSCBS>
      <CST>000</CST><cClassTrib>000001</cClassTrib>
      <gIBSCBS>
        <vBC>1000.00</vBC>
        <gIBSUF><pIBSUF>0.10</pIBSUF><gDif><pDif>0</pDif><vDif>0.00</vDif></gDif><vIBSUF>1.00</vIBSUF></gIBSUF>
        <gIBSMun><pIBSMun>0.00</pIBSMun><vIBSMun>0.00</vIBSMun></gIBSMun>
        <vIBS>1.00</vIBS>
        <gCBS><pCBS>0.90</pCBS><vCBS>9.00</vCBS></gCBS>
      </gIBSCBS>
    </IBSCBS>
  </imposto>
</det>"#;

    const TOTALS: &str = r#"
<total>
  <ICMSTot><vBC>1000.00</vBC><vICMS>180.00</vICMS><vProd>1000.00</vProd><vIPI>50.00</vIPI>
    <vPIS>16.50</vPIS><vCOFINS>76.00</vCOFINS><vNF>1060.00</vNF></ICMSTot>
  <IBSCBSTot><vBCIBSCBS>1000.00</vBCIBSCBS>
    <gIBS><gIBSUF><vIBSUF>1.00</vIBSUF></gIBSUF><vIBS>1.00</vIBS></gIBS>
    <gCBS><vCBS>9.00</vCBS></gCBS></IBSCBSTot>
</total>"#;

    const HEADER: &str = r#"
<ide><cUF>35</cUF><mod>55</mod><serie>1</serie><nNF>123</nNF>
  <dhEmi>2026-01-15T10:30:00-03:00</dhEmi><tpAmb>2</tpAmb></ide>
<emit><CNPJ>12345678000195</CNPJ><xNome>Emitente Ltda</xNome>
  <enderEmit><xLgr>Rua A</xLgr><UF>SP</UF></enderEmit><IE>111222333444</IE></emit>
<dest><CNPJ>98765432000110</CNPJ><xNome>Destinatario SA</xNome>
  <enderDest><UF>RJ</UF></enderDest><indIEDest>1</indIEDest><IE>77889900</IE></dest>"#;

    fn full() -> String {
        nfe(&format!("{HEADER}{ITEM}{TOTALS}"))
    }

    #[test]
    fn parses_complete_document() {
        let inv = from_nfe_xml(full().as_bytes()).unwrap();

        assert_eq!(inv.header.model.as_deref(), Some("55"));
        assert_eq!(inv.header.number.as_deref(), Some("123"));
        assert_eq!(inv.header.environment.as_deref(), Some("2"));
        assert_eq!(inv.header.layout_version.as_deref(), Some("4.00"));
        assert!(inv.header.issued_at.is_some());
        assert_eq!(inv.issuer.cnpj.as_deref(), Some("12345678000195"));
        assert_eq!(inv.issuer.uf.as_deref(), Some("SP"));
        assert_eq!(inv.issuer.state_registration.as_deref(), Some("111222333444"));
        assert_eq!(inv.recipient.uf.as_deref(), Some("RJ"));
        assert_eq!(inv.recipient.ie_indicator.as_deref(), Some("1"));

        assert_eq!(inv.items.len(), 1);
        let item = &inv.items[0];
        assert_eq!(item.number, 1);
        assert_eq!(item.ncm.as_deref(), Some("73181500"));
        assert_eq!(item.values.product, Some(dec!(1000.00)));
        assert_eq!(item.values.freight, Some(dec!(10.00)));

        let icms = item.icms.as_ref().unwrap();
        assert_eq!(icms.group, "ICMS00");
        assert_eq!(icms.cst.as_deref(), Some("00"));
        assert_eq!(icms.value, Some(dec!(180.00)));
        assert_eq!(item.ipi.as_ref().unwrap().group, "IPITrib");
        assert_eq!(item.ipi_value(), dec!(50.00));
        assert_eq!(item.pis.as_ref().unwrap().rate, Some(dec!(1.65)));
        assert_eq!(item.cofins.as_ref().unwrap().value, Some(dec!(76.00)));

        let g = item.ibs_cbs.as_ref().unwrap();
        assert_eq!(g.cst.as_deref(), Some("000"));
        assert_eq!(g.class_code.as_deref(), Some("000001"));
        assert_eq!(g.base, Some(dec!(1000.00)));
        assert_eq!(g.ibs_state_rate, Some(dec!(0.10)));
        assert_eq!(g.ibs_state_value, Some(dec!(1.00)));
        assert_eq!(g.ibs_value, Some(dec!(1.00)));
        assert_eq!(g.cbs_rate, Some(dec!(0.90)));
        assert_eq!(g.cbs_value, Some(dec!(9.00)));

        assert_eq!(inv.totals.invoice, Some(dec!(1060.00)));
        assert_eq!(inv.totals.ibs_cbs_base, Some(dec!(1000.00)));
        assert_eq!(inv.totals.ibs, Some(dec!(1.00)));
        assert_eq!(inv.totals.cbs, Some(dec!(9.00)));
        assert!(inv.invalid_fields.is_empty());
    }

    #[test]
    fn accepts_nfe_proc_wrapper() {
        let xml = format!(
            r#"<nfeProc xmlns="{NFE_NAMESPACE}" versao="4.00">{}<protNFe versao="4.00"><infProt><tpAmb>1</tpAmb></infProt></protNFe></nfeProc>"#,
            nfe(ITEM).trim_start_matches(r#"<?xml version="1.0" encoding="UTF-8"?>"#)
        );
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        assert_eq!(inv.items.len(), 1);
        // protNFe/infProt/tpAmb is not the issuance environment
        assert_eq!(inv.header.environment, None);
    }

    #[test]
    fn accepts_prefixed_namespace() {
        let xml = format!(
            r#"<nfe:NFe xmlns:nfe="{NFE_NAMESPACE}"><nfe:infNFe versao="4.00"><nfe:det nItem="3"><nfe:prod><nfe:vProd>5.00</nfe:vProd></nfe:prod></nfe:det></nfe:infNFe></nfe:NFe>"#
        );
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        assert_eq!(inv.items[0].number, 3);
        assert_eq!(inv.items[0].values.product, Some(dec!(5.00)));
    }

    #[test]
    fn missing_ibscbs_group_is_absent() {
        let item = ITEM.replace(
            &ITEM[ITEM.find("<IBSCBS>").unwrap()..ITEM.find("</IBSCBS>").unwrap() + 9],
            "",
        );
        let inv = from_nfe_xml(nfe(&item).as_bytes()).unwrap();
        assert!(inv.items[0].ibs_cbs.is_none());
        assert!(inv.is_pre_rollout());
    }

    #[test]
    fn empty_ibscbs_element_counts_as_present() {
        let xml = nfe(r#"<det nItem="1"><prod><vProd>1.00</vProd></prod><imposto><IBSCBS/></imposto></det>"#);
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        let g = inv.items[0].ibs_cbs.as_ref().unwrap();
        assert_eq!(g.cst, None);
        assert_eq!(g.base, None);
    }

    #[test]
    fn untaxed_ipi_group() {
        let xml = nfe(r#"<det nItem="1"><prod><vProd>1.00</vProd></prod><imposto><IPI><cEnq>999</cEnq><IPINT><CST>53</CST></IPINT></IPI></imposto></det>"#);
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        let ipi = inv.items[0].ipi.as_ref().unwrap();
        assert_eq!(ipi.group, "IPINT");
        assert_eq!(ipi.cst.as_deref(), Some("53"));
        assert_eq!(ipi.value, None);
    }

    #[test]
    fn simples_nacional_csosn_read_as_cst() {
        let xml = nfe(r#"<det nItem="1"><prod><vProd>1.00</vProd></prod><imposto><ICMS><ICMSSN102><orig>0</orig><CSOSN>102</CSOSN></ICMSSN102></ICMS></imposto></det>"#);
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        let icms = inv.items[0].icms.as_ref().unwrap();
        assert_eq!(icms.group, "ICMSSN102");
        assert_eq!(icms.cst.as_deref(), Some("102"));
    }

    #[test]
    fn unreadable_numbers_are_recorded() {
        let xml = nfe(r#"<det nItem="2"><prod><vProd>12,50</vProd></prod><imposto><IBSCBS><CST>000</CST><gIBSCBS><vBC>abc</vBC></gIBSCBS></IBSCBS></imposto></det><total><ICMSTot><vNF>1e3</vNF></ICMSTot></total>"#);
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        assert_eq!(inv.items[0].values.product, None);
        assert_eq!(inv.items[0].ibs_cbs.as_ref().unwrap().base, None);
        assert_eq!(inv.totals.invoice, None);
        let paths: Vec<_> = inv.invalid_fields.iter().map(|f| (f.item, f.path.as_str())).collect();
        assert_eq!(
            paths,
            vec![
                (Some(2), "prod/vProd"),
                (Some(2), "IBSCBS/gIBSCBS/vBC"),
                (None, "ICMSTot/vNF"),
            ]
        );
    }

    #[test]
    fn item_without_number_uses_position() {
        let xml = nfe(r#"<det><prod><vProd>1.00</vProd></prod></det><det nItem="x"><prod><vProd>2.00</vProd></prod></det>"#);
        let inv = from_nfe_xml(xml.as_bytes()).unwrap();
        let numbers: Vec<_> = inv.items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn rejects_malformed_input() {
        let cases: &[&[u8]] = &[
            b"",
            b"   ",
            b"<NFe><infNFe></NFe>",
            b"<NFe xmlns=\"http://www.portalfiscal.inf.br/nfe\"><infNFe versao=\"4.00\">",
            b"<NFe xmlns=\"http://www.portalfiscal.inf.br/nfe\"><infNFe ver",
            b"<NFe/><NFe/>",
            b"<NFe/>trailing",
            b"\xff\xfe<NFe/>",
        ];
        for case in cases {
            let err = from_nfe_xml(case).unwrap_err();
            assert!(
                matches!(err, RtcError::MalformedDocument(_)),
                "{:?} -> {err:?}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn rejects_unsupported_layouts() {
        let cases = [
            r#"<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"/>"#.to_string(),
            r#"<NFe><infNFe versao="4.00"/></NFe>"#.to_string(),
            format!(r#"<NFe xmlns="{NFE_NAMESPACE}"/>"#),
            format!(r#"<NFe xmlns="{NFE_NAMESPACE}"><infNFe/></NFe>"#),
            format!(r#"<NFe xmlns="{NFE_NAMESPACE}"><infNFe versao="3.10"/></NFe>"#),
        ];
        for case in &cases {
            let err = from_nfe_xml(case.as_bytes()).unwrap_err();
            assert!(matches!(err, RtcError::UnsupportedLayout(_)), "{case} -> {err:?}");
        }
    }

    #[test]
    fn parse_decimal_accepts_only_plain_notation() {
        assert_eq!(parse_decimal("1000.00"), Some(dec!(1000.00)));
        assert_eq!(parse_decimal(" 0.5 "), Some(dec!(0.5)));
        assert_eq!(parse_decimal("-3"), Some(dec!(-3)));
        assert_eq!(parse_decimal("1,00"), None);
        assert_eq!(parse_decimal("1e3"), None);
        assert_eq!(parse_decimal("1_000"), None);
        assert_eq!(parse_decimal(".5"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn parse_decimal_rejects_values_wider_than_tdec() {
        assert_eq!(parse_decimal("9999999999999.99"), Some(dec!(9999999999999.99)));
        assert_eq!(parse_decimal("0.0000000001"), Some(dec!(0.0000000001)));
        assert_eq!(parse_decimal("10000000000000.00"), None);
        assert_eq!(parse_decimal("79228162514264337593543950335"), None);
        assert_eq!(parse_decimal("1.00000000001"), None);
    }
}
