//! Screen maps for the standard-order creation transaction (VA01),
//! including the customer-specific header tabs. Locators target the
//! scripting tree of the classic client; the engine treats them as
//! opaque strings.

use once_cell::sync::Lazy;
use sapflow::{
    Action, AttachmentSpec, CallFunction, GuiElement, Screen, ScreenOrder, ScreenRegistry,
};

fn header_button() -> Action {
    Action::click(r"wnd[0]/usr/subSUBSCREEN_HEADER:SAPMV45A:4021/btnBT_HEAD")
        .describe("open header data")
}

fn initial_screen() -> Screen {
    Screen::new("VA01_INITIAL")
        .header_data()
        .field("order type", GuiElement::text(r"wnd[0]/usr/ctxtVBAK-AUART"))
        .field(
            "sales organization",
            GuiElement::text(r"wnd[0]/usr/ctxtVBAK-VKORG"),
        )
        .field(
            "distribution channel",
            GuiElement::text(r"wnd[0]/usr/ctxtVBAK-VTWEG"),
        )
        .field("division", GuiElement::text(r"wnd[0]/usr/ctxtVBAK-SPART"))
}

fn overview_screen() -> Screen {
    Screen::new("VA01_OVERVIEW")
        .field(
            "sold to party",
            GuiElement::text(
                r"wnd[0]/usr/subSUBSCREEN_HEADER:SAPMV45A:4021/subPART-SUB:SAPMV45A:4701/ctxtKUAGV-KUNNR",
            ),
        )
        .field(
            "ship to party",
            GuiElement::text(
                r"wnd[0]/usr/subSUBSCREEN_HEADER:SAPMV45A:4021/subPART-SUB:SAPMV45A:4701/ctxtKUWEV-KUNNR",
            ),
        )
        .field(
            "po number",
            GuiElement::text(r"wnd[0]/usr/subSUBSCREEN_HEADER:SAPMV45A:4021/txtVBKD-BSTKD"),
        )
        .field(
            "po date",
            GuiElement::text(r"wnd[0]/usr/subSUBSCREEN_HEADER:SAPMV45A:4021/ctxtVBKD-BSTDK"),
        )
}

fn sales_screen() -> Screen {
    Screen::new("VA01_SALES")
        .entry(Action::click(
            r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\01",
        ))
        .field(
            "payment terms",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\01/ssubSUBSCREEN_BODY:SAPMV45A:4400/ssubHEADER_FRAME:SAPMV45A:4440/ctxtVBKD-ZTERM",
            ),
        )
        .field(
            "incoterms 1",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\01/ssubSUBSCREEN_BODY:SAPMV45A:4400/ssubHEADER_FRAME:SAPMV45A:4440/lblVBKD-INCO1",
            ),
        )
        .field(
            "incoterms 2",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\01/ssubSUBSCREEN_BODY:SAPMV45A:4400/ssubHEADER_FRAME:SAPMV45A:4440/txtVBKD-INCO2",
            ),
        )
}

fn item_overview_screen() -> Screen {
    Screen::new("VA01_ITEM_OVERVIEW")
        .no_confirm()
        .entry(Action::click(
            r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\02",
        ))
        .field(
            "table",
            GuiElement::table(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\02/ssubSUBSCREEN_BODY:SAPMV45A:4401/subSUBSCREEN_TC:SAPMV45A:4900/tblSAPMV45ATCTRL_U_ERF_AUFTRAG",
            )
            .with_attachment(pis_attachment(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\02/ssubSUBSCREEN_BODY:SAPMV45A:4401/subSUBSCREEN_TC:SAPMV45A:4900/subSUBSCREEN_BUTTONS:SAPMV45A:4050/btnBT_MKAL",
            )),
        )
}

fn fast_data_entry_screen() -> Screen {
    Screen::new("VA01_FAST_DATA_ENTRY")
        .no_confirm()
        .entry(Action::click(
            r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\08",
        ))
        .field(
            "char. display",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\08/ssubSUBSCREEN_BODY:SAPMV45A:7901/cmbRV45A-MUEBS",
            ),
        )
        .field(
            "table",
            GuiElement::table(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\08/ssubSUBSCREEN_BODY:SAPMV45A:7901/subSUBSCREEN_TC:SAPMV45A:7905/tblSAPMV45ATCTRL_U_MILL_SE_KONFIG",
            )
            .with_attachment(pis_attachment(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_OVERVIEW/tabpT\08/ssubSUBSCREEN_BODY:SAPMV45A:7901/subSUBSCREEN_TC:SAPMV45A:7905/subSUBSCREEN_BUTTONS:SAPMV45A:4050/btnBT_MKAL",
            )),
        )
}

/// The pre-sales-document attachment dialog is reached through the same
/// menu path from either item table; only the select-all button differs.
fn pis_attachment(select_all: &str) -> AttachmentSpec {
    AttachmentSpec {
        column: "pis".to_string(),
        select_all: select_all.to_string(),
        menu_id: r"wnd[0]/mbar/menu[3]/menu[10]".to_string(),
        kind_field_id: r"wnd[1]/usr/tblSAPLCVOBTCTRL_DOKUMENTE/ctxtDRAW-DOKAR[0,0]".to_string(),
        number_field_id: r"wnd[1]/usr/tblSAPLCVOBTCTRL_DOKUMENTE/ctxtDRAW-DOKNR[1,0]".to_string(),
        kind: "PIS".to_string(),
    }
}

fn header_sales_screen() -> Screen {
    Screen::new("HEADER_SALES")
        .entry(header_button())
        .entry(Action::click(r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\01"))
        .field(
            "doc. currency",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\01/ssubSUBSCREEN_BODY:SAPMV45A:4301/ctxtVBAK-WAERK",
            ),
        )
}

fn header_partners_screen() -> Screen {
    Screen::new("HEADER_PARTNERS")
        .entry(header_button())
        .entry(Action::click(r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\08"))
        .field(
            "partner function",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\08/ssubSUBSCREEN_BODY:SAPMV45A:4352/subSUBSCREEN_PARTNER_OVERVIEW:SAPLV09C:1000/tblSAPLV09CGV_TC_PARTNER_OVERVIEW/cmbGVS_TC_DATA-REC-PARVW[0,4]",
            ),
        )
        .field(
            "partner",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\08/ssubSUBSCREEN_BODY:SAPMV45A:4352/subSUBSCREEN_PARTNER_OVERVIEW:SAPLV09C:1000/tblSAPLV09CGV_TC_PARTNER_OVERVIEW/ctxtGVS_TC_DATA-REC-PARTNER[1,4]",
            ),
        )
}

fn header_texts_screen() -> Screen {
    let tree = r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\09/ssubSUBSCREEN_BODY:SAPMV45A:4152/subSUBSCREEN_TEXT:SAPLV70T:2100/cntlSPLITTER_CONTAINER/shellcont/shellcont/shell/shellcont[0]/shell";
    let editor = r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\09/ssubSUBSCREEN_BODY:SAPMV45A:4152/subSUBSCREEN_TEXT:SAPLV70T:2100/cntlSPLITTER_CONTAINER/shellcont/shellcont/shell/shellcont[1]/shell";
    Screen::new("HEADER_TEXTS")
        .no_confirm()
        .entry(header_button())
        .entry(Action::click(r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\09"))
        .field(
            "click_notify_remiter",
            GuiElement::composite(tree)
                .calling(CallFunction::new("selectItem", &["Z041", "Column1"]))
                .calling(CallFunction::new(
                    "ensureVisibleHorizontalItem",
                    &["Z041", "Column1"],
                ))
                .calling(CallFunction::new("doubleClickItem", &["Z041", "Column1"])),
        )
        .field("notify", GuiElement::text(editor))
}

fn header_add_data_a_screen() -> Screen {
    Screen::new("HEADER_ADD_DATA_A")
        .entry(header_button())
        .entry(Action::click(r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\12"))
        .field(
            "channel type",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\12/ssubSUBSCREEN_BODY:SAPMV45A:4309/ctxtVBAK-ZECOM",
            ),
        )
        .field(
            "sub channel type",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\12/ssubSUBSCREEN_BODY:SAPMV45A:4309/ctxtVBAK-ZSCTYP",
            ),
        )
        .field(
            "order type",
            GuiElement::text(
                r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\12/ssubSUBSCREEN_BODY:SAPMV45A:4309/cmbVBAK-ZORD_TYPE",
            ),
        )
}

fn header_add_data_b_screen() -> Screen {
    let body = r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\13/ssubSUBSCREEN_BODY:SAPMV45A:4312/sub8309:SAPMV45A:8309";
    Screen::new("HEADER_ADD_DATA_B")
        .entry(header_button())
        .entry(Action::click(r"wnd[0]/usr/tabsTAXI_TABSTRIP_HEAD/tabpT\13"))
        .field(
            "window start date",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_STARTDT")),
        )
        .field(
            "window cancel date",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_CANDT")),
        )
        .field(
            "plan ex-factory date",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_EXFACDT")),
        )
        .field(
            "plan handover date",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_HANODT")),
        )
        .field(
            "port of shipment",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_POS")),
        )
        .field(
            "final destination",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_FDEST")),
        )
        .field(
            "country of destination",
            GuiElement::text(format!("{body}/txtVBAK-ZZSD_CFDEST")),
        )
        .field(
            "port of discharge",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSD_POD")),
        )
        .field(
            "stake holder",
            GuiElement::text(format!("{body}/ctxtVBAK-ZZSTAKE_HOLDER")),
        )
}

/// All VA01 screens, registered once per process.
pub fn screen_registry() -> &'static ScreenRegistry {
    static REGISTRY: Lazy<ScreenRegistry> = Lazy::new(|| {
        [
            initial_screen(),
            overview_screen(),
            sales_screen(),
            item_overview_screen(),
            fast_data_entry_screen(),
            header_sales_screen(),
            header_partners_screen(),
            header_texts_screen(),
            header_add_data_a_screen(),
            header_add_data_b_screen(),
        ]
        .into_iter()
        .collect()
    });
    &REGISTRY
}

fn closing_sequence() -> Vec<ScreenOrder> {
    vec![
        ScreenOrder::new("HEADER_SALES"),
        ScreenOrder::new("HEADER_PARTNERS"),
        ScreenOrder::new("HEADER_TEXTS"),
        ScreenOrder::new("HEADER_ADD_DATA_A"),
        ScreenOrder::new("HEADER_ADD_DATA_B").then(Action::back()),
    ]
}

/// Standard sequence entering line items through the item overview table.
pub fn default_sequence() -> Vec<ScreenOrder> {
    let mut sequence = vec![
        ScreenOrder::new("VA01_INITIAL"),
        ScreenOrder::new("VA01_OVERVIEW"),
        ScreenOrder::new("VA01_SALES"),
        ScreenOrder::new("VA01_ITEM_OVERVIEW"),
    ];
    sequence.extend(closing_sequence());
    sequence
}

/// Variant entering configurable materials through the fast data entry tab.
pub fn fast_entry_sequence() -> Vec<ScreenOrder> {
    let mut sequence = vec![
        ScreenOrder::new("VA01_INITIAL"),
        ScreenOrder::new("VA01_OVERVIEW"),
        ScreenOrder::new("VA01_SALES"),
        ScreenOrder::new("VA01_FAST_DATA_ENTRY"),
    ];
    sequence.extend(closing_sequence());
    sequence
}
