//! Shared fixtures: invoices built in code and rendered as NF-e XML.

#![allow(dead_code)]

use std::fmt::Write;

use nfe_rtc::core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const NFE_NS: &str = "http://www.portalfiscal.inf.br/nfe";

pub fn issuer() -> Party {
    Party {
        cnpj: Some("12345678000195".into()),
        state_registration: Some("111222333444".into()),
        name: Some("Emitente Ltda".into()),
        uf: Some("SP".into()),
        ..Default::default()
    }
}

pub fn recipient() -> Party {
    Party {
        cnpj: Some("98765432000110".into()),
        state_registration: Some("77889900".into()),
        name: Some("Destinatario SA".into()),
        uf: Some("RJ".into()),
        ie_indicator: Some("1".into()),
        ..Default::default()
    }
}

/// Taxed item at the pilot rates with ICMS 18 %, PIS 1.65 %, COFINS 7.60 %.
pub fn pilot_item(n: u32, value: Decimal) -> LineItem {
    LineItemBuilder::new(n, value)
        .icms("00", value, dec!(18))
        .pis("01", value, dec!(1.65))
        .cofins("01", value, dec!(7.60))
        .ibs_cbs_pilot("000", "000001")
        .build()
}

/// Consistent two-item pilot invoice.
pub fn pilot_invoice() -> Invoice {
    InvoiceBuilder::new()
        .number("123")
        .issuer(issuer())
        .recipient(recipient())
        .add_item(pilot_item(1, dec!(1000.00)))
        .add_item(pilot_item(2, dec!(250.00)))
        .derive_totals()
        .build()
}

/// Invoice whose items carry no IBS/CBS group at all.
pub fn pre_rollout_invoice() -> Invoice {
    let item = |n, v| {
        LineItemBuilder::new(n, v)
            .icms("00", v, dec!(18))
            .pis("01", v, dec!(1.65))
            .cofins("01", v, dec!(7.60))
            .build()
    };
    InvoiceBuilder::new()
        .issuer(issuer())
        .recipient(recipient())
        .add_item(item(1, dec!(100.00)))
        .add_item(item(2, dec!(40.00)))
        .derive_totals()
        .build()
}

fn tag(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(v) = value {
        let _ = write!(out, "<{name}>{v}</{name}>");
    }
}

fn amount(out: &mut String, name: &str, value: Option<Decimal>) {
    tag(out, name, value.map(|v| v.to_string()).as_deref());
}

fn classic(out: &mut String, family: &str, tax: Option<&ClassicTax>) {
    let Some(t) = tax else {
        return;
    };
    let _ = write!(out, "<{family}>");
    if family == "IPI" {
        out.push_str("<cEnq>999</cEnq>");
    }
    let _ = write!(out, "<{}>", t.group);
    if family == "ICMS" {
        out.push_str("<orig>0</orig>");
    }
    tag(out, "CST", t.cst.as_deref());
    amount(out, "vBC", t.base);
    amount(out, &format!("p{family}"), t.rate);
    amount(out, &format!("v{family}"), t.value);
    let _ = write!(out, "</{}></{family}>", t.group);
}

fn ibs_cbs(out: &mut String, group: Option<&IbsCbs>) {
    let Some(g) = group else {
        return;
    };
    out.push_str("<IBSCBS>");
    tag(out, "CST", g.cst.as_deref());
    tag(out, "cClassTrib", g.class_code.as_deref());
    let has_values = g.base.is_some() || g.ibs_value.is_some() || g.cbs_value.is_some();
    if has_values {
        out.push_str("<gIBSCBS>");
        amount(out, "vBC", g.base);
        if g.ibs_state_rate.is_some() || g.ibs_state_value.is_some() {
            out.push_str("<gIBSUF>");
            amount(out, "pIBSUF", g.ibs_state_rate);
            amount(out, "vIBSUF", g.ibs_state_value);
            out.push_str("</gIBSUF>");
        }
        if g.ibs_municipal_rate.is_some() || g.ibs_municipal_value.is_some() {
            out.push_str("<gIBSMun>");
            amount(out, "pIBSMun", g.ibs_municipal_rate);
            amount(out, "vIBSMun", g.ibs_municipal_value);
            out.push_str("</gIBSMun>");
        }
        amount(out, "vIBS", g.ibs_value);
        if g.cbs_rate.is_some() || g.cbs_value.is_some() {
            out.push_str("<gCBS>");
            amount(out, "pCBS", g.cbs_rate);
            amount(out, "vCBS", g.cbs_value);
            out.push_str("</gCBS>");
        }
        out.push_str("</gIBSCBS>");
    }
    out.push_str("</IBSCBS>");
}

/// Render an invoice as an `nfeProc` document in layout 4.00.
pub fn nfe_xml(inv: &Invoice) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<?xml version="1.0" encoding="UTF-8"?><nfeProc xmlns="{NFE_NS}" versao="4.00"><NFe xmlns="{NFE_NS}"><infNFe versao="4.00" Id="NFe35260112345678000195550010000001231000001234">"#
    );

    let h = &inv.header;
    out.push_str("<ide><cUF>35</cUF>");
    tag(&mut out, "mod", h.model.as_deref());
    tag(&mut out, "serie", h.series.as_deref());
    tag(&mut out, "nNF", h.number.as_deref());
    tag(&mut out, "dhEmi", h.issued_at.map(|d| d.to_rfc3339()).as_deref());
    tag(&mut out, "tpAmb", h.environment.as_deref());
    out.push_str("</ide>");

    for (name, address, p) in [
        ("emit", "enderEmit", &inv.issuer),
        ("dest", "enderDest", &inv.recipient),
    ] {
        let _ = write!(out, "<{name}>");
        tag(&mut out, "CNPJ", p.cnpj.as_deref());
        tag(&mut out, "CPF", p.cpf.as_deref());
        tag(&mut out, "xNome", p.name.as_deref());
        let _ = write!(out, "<{address}><xMun>Cidade</xMun>");
        tag(&mut out, "UF", p.uf.as_deref());
        let _ = write!(out, "</{address}>");
        tag(&mut out, "indIEDest", p.ie_indicator.as_deref());
        tag(&mut out, "IE", p.state_registration.as_deref());
        let _ = write!(out, "</{name}>");
    }

    for item in &inv.items {
        let _ = write!(out, r#"<det nItem="{}"><prod>"#, item.number);
        tag(&mut out, "cProd", item.product_code.as_deref());
        tag(&mut out, "xProd", item.description.as_deref());
        tag(&mut out, "NCM", item.ncm.as_deref());
        tag(&mut out, "CFOP", item.cfop.as_deref());
        amount(&mut out, "vProd", item.values.product);
        amount(&mut out, "vFrete", item.values.freight);
        amount(&mut out, "vSeg", item.values.insurance);
        amount(&mut out, "vDesc", item.values.discount);
        amount(&mut out, "vOutro", item.values.other);
        out.push_str("</prod><imposto>");
        classic(&mut out, "ICMS", item.icms.as_ref());
        classic(&mut out, "IPI", item.ipi.as_ref());
        classic(&mut out, "PIS", item.pis.as_ref());
        classic(&mut out, "COFINS", item.cofins.as_ref());
        ibs_cbs(&mut out, item.ibs_cbs.as_ref());
        out.push_str("</imposto></det>");
    }

    let t = &inv.totals;
    out.push_str("<total><ICMSTot>");
    amount(&mut out, "vBC", t.icms_base);
    amount(&mut out, "vICMS", t.icms);
    amount(&mut out, "vProd", t.products);
    amount(&mut out, "vIPI", t.ipi);
    amount(&mut out, "vPIS", t.pis);
    amount(&mut out, "vCOFINS", t.cofins);
    amount(&mut out, "vNF", t.invoice);
    out.push_str("</ICMSTot>");
    if t.ibs_cbs_base.is_some() || t.ibs.is_some() || t.cbs.is_some() {
        out.push_str("<IBSCBSTot>");
        amount(&mut out, "vBCIBSCBS", t.ibs_cbs_base);
        out.push_str("<gIBS>");
        amount(&mut out, "vIBS", t.ibs);
        out.push_str("</gIBS><gCBS>");
        amount(&mut out, "vCBS", t.cbs);
        out.push_str("</gCBS></IBSCBSTot>");
    }
    out.push_str("</total></infNFe></NFe>");
    out.push_str(r#"<protNFe versao="4.00"><infProt><tpAmb>2</tpAmb><cStat>100</cStat></infProt></protNFe></nfeProc>"#);
    out
}
