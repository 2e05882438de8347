//! Detail card for the selected parcel: an info tab and a contact form.

use crate::data::Parcel;
use regex::Regex;
use std::sync::LazyLock;

static RUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}\.\d{3}\.\d{3}-[\dkK]$").expect("valid RUT pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{9,15}$").expect("valid phone pattern"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetailTab {
    #[default]
    Info,
    Contact,
}

impl DetailTab {
    pub const ALL: [DetailTab; 2] = [DetailTab::Info, DetailTab::Contact];

    pub fn title(self) -> &'static str {
        match self {
            DetailTab::Info => "Info",
            DetailTab::Contact => "Contacto",
        }
    }

    pub fn index(self) -> usize {
        match self {
            DetailTab::Info => 0,
            DetailTab::Contact => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DetailTab::Info => DetailTab::Contact,
            DetailTab::Contact => DetailTab::Info,
        }
    }
}

/// Read-only facts about a parcel
#[derive(Clone, Debug, PartialEq)]
pub struct InfoView {
    pub title: String,
    pub rows: Vec<(&'static str, String)>,
}

impl InfoView {
    pub fn of(parcel: &Parcel) -> Self {
        Self {
            title: format!("Lote {}", parcel.label()),
            rows: vec![
                ("Estado", parcel.estado_text()),
                ("Superficie", format!("{} Ha.", parcel.superficie_text())),
                ("Valor", format!("${}", parcel.valor_text())),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Nombre,
    Rut,
    Email,
    Telefono,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Nombre, Field::Rut, Field::Email, Field::Telefono];

    pub fn label(self) -> &'static str {
        match self {
            Field::Nombre => "Nombre",
            Field::Rut => "RUT",
            Field::Email => "Email",
            Field::Telefono => "Teléfono",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Message shown when the value doesn't pass
    fn hint(self) -> &'static str {
        match self {
            Field::Nombre => "Campo requerido",
            Field::Rut => "Formato válido: 12.345.678-9",
            Field::Email => "Email no válido",
            Field::Telefono => "Debe ser un número de teléfono válido",
        }
    }

    fn accepts(self, value: &str) -> bool {
        match self {
            Field::Nombre => !value.is_empty(),
            Field::Rut => RUT.is_match(value),
            Field::Email => EMAIL.is_match(value),
            Field::Telefono => PHONE.is_match(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// A validated contact request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactRequest {
    pub lote: String,
    pub nombre: String,
    pub rut: String,
    pub email: String,
    pub telefono: String,
}

#[derive(Clone, Debug, Default)]
pub struct ContactForm {
    values: [String; 4],
    focus: usize,
    errors: Vec<FieldError>,
    sent: bool,
}

impl ContactForm {
    pub fn value(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn focused(&self) -> Field {
        Field::ALL[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Field::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Field::ALL.len() - 1) % Field::ALL.len();
    }

    pub fn input(&mut self, ch: char) {
        self.values[self.focus].push(ch);
        self.sent = false;
    }

    pub fn backspace(&mut self) {
        self.values[self.focus].pop();
        self.sent = false;
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn error_for(&self, field: Field) -> Option<&'static str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message)
    }

    /// Whether the last submission was accepted and nothing changed since
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn validate(&self, lote: &str) -> Result<ContactRequest, Vec<FieldError>> {
        let errors: Vec<FieldError> = Field::ALL
            .iter()
            .filter(|f| !f.accepts(self.value(**f).trim()))
            .map(|&field| FieldError {
                field,
                message: field.hint(),
            })
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }
        let get = |f: Field| self.value(f).trim().to_string();
        Ok(ContactRequest {
            lote: lote.to_string(),
            nombre: get(Field::Nombre),
            rut: get(Field::Rut),
            email: get(Field::Email),
            telefono: get(Field::Telefono),
        })
    }

    /// Validate and accept the form. Accepted requests only go to the log.
    pub fn submit(&mut self, lote: &str) -> Result<ContactRequest, usize> {
        match self.validate(lote) {
            Ok(request) => {
                tracing::info!(
                    lote = %request.lote,
                    nombre = %request.nombre,
                    rut = %request.rut,
                    email = %request.email,
                    telefono = %request.telefono,
                    "contact form submitted"
                );
                self.errors.clear();
                self.sent = true;
                Ok(request)
            }
            Err(errors) => {
                let count = errors.len();
                if let Some(first) = errors.first() {
                    self.focus = first.field.index();
                }
                self.errors = errors;
                self.sent = false;
                Err(count)
            }
        }
    }
}

/// What the card shows for one selected parcel
pub struct DetailCard<'a> {
    pub tab: DetailTab,
    pub info: InfoView,
    pub form: &'a ContactForm,
}

/// Card state that outlives a single frame. Switching to another parcel
/// starts over on the info tab with an empty form.
#[derive(Debug, Default)]
pub struct DetailPresenter {
    parcel_id: Option<String>,
    tab: DetailTab,
    form: ContactForm,
}

impl DetailPresenter {
    /// Follow the controller's selection
    pub fn sync(&mut self, selected: Option<&Parcel>) {
        let id = selected.map(|p| p.id.as_str());
        if self.parcel_id.as_deref() != id {
            self.parcel_id = id.map(str::to_string);
            self.tab = DetailTab::Info;
            self.form = ContactForm::default();
        }
    }

    /// Nothing to show without a selection
    pub fn card<'a>(&'a self, selected: Option<&Parcel>) -> Option<DetailCard<'a>> {
        let parcel = selected?;
        Some(DetailCard {
            tab: self.tab,
            info: InfoView::of(parcel),
            form: &self.form,
        })
    }

    pub fn tab(&self) -> DetailTab {
        self.tab
    }

    pub fn switch_tab(&mut self) {
        self.tab = self.tab.toggled();
    }

    pub fn form_mut(&mut self) -> &mut ContactForm {
        &mut self.form
    }

    pub fn submit(&mut self) -> Option<Result<ContactRequest, usize>> {
        let lote = self.parcel_id.as_deref()?;
        Some(self.form.submit(lote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawRecord;
    use serde_json::json;

    fn parcel(id: &str, fields: serde_json::Value) -> Parcel {
        let serde_json::Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        Parcel::from_record(RawRecord {
            id: id.into(),
            fields,
        })
    }

    fn fill(form: &mut ContactForm, values: [&str; 4]) {
        for value in values {
            for ch in value.chars() {
                form.input(ch);
            }
            form.focus_next();
        }
    }

    #[test]
    fn test_no_card_without_selection() {
        let presenter = DetailPresenter::default();
        assert!(presenter.card(None).is_none());
    }

    #[test]
    fn test_info_rows() {
        let p = parcel(
            "lote_12",
            json!({"estado": "Disponible", "superficie": 5.2, "valor": "45.000.000"}),
        );
        let info = InfoView::of(&p);
        assert_eq!(info.title, "Lote 12");
        assert_eq!(
            info.rows,
            vec![
                ("Estado", "Disponible".to_string()),
                ("Superficie", "5.2 Ha.".to_string()),
                ("Valor", "$45.000.000".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_attributes_show_not_available() {
        let p = parcel("lote_3", json!({}));
        let info = InfoView::of(&p);
        assert_eq!(info.rows[0].1, "N/A");
        assert_eq!(info.rows[1].1, "N/A Ha.");
        assert_eq!(info.rows[2].1, "$N/A");
    }

    #[test]
    fn test_rut_pattern() {
        for ok in ["12.345.678-9", "1.234.567-k", "9.876.543-K"] {
            assert!(Field::Rut.accepts(ok), "{ok}");
        }
        for bad in ["12345678-9", "123.456.789-0", "12.345.678-x", ""] {
            assert!(!Field::Rut.accepts(bad), "{bad}");
        }
    }

    #[test]
    fn test_phone_pattern() {
        assert!(Field::Telefono.accepts("+56912345678"));
        assert!(Field::Telefono.accepts("912345678"));
        assert!(!Field::Telefono.accepts("12345678"));
        assert!(!Field::Telefono.accepts("+56 9 1234 5678"));
        assert!(!Field::Telefono.accepts("1234567890123456"));
    }

    #[test]
    fn test_submit_valid_form() {
        let mut form = ContactForm::default();
        fill(&mut form, ["Ana Pérez", "12.345.678-5", "ana@example.cl", "+56912345678"]);
        let request = form.submit("lote_7").unwrap();
        assert_eq!(request.lote, "lote_7");
        assert_eq!(request.nombre, "Ana Pérez");
        assert!(form.is_sent());
        assert!(form.errors().is_empty());

        form.input('x');
        assert!(!form.is_sent());
    }

    #[test]
    fn test_submit_reports_each_bad_field() {
        let mut form = ContactForm::default();
        fill(&mut form, ["", "12345678", "ana@", "+56912345678"]);
        assert_eq!(form.submit("lote_7"), Err(3));
        assert!(form.error_for(Field::Nombre).is_some());
        assert_eq!(form.error_for(Field::Rut), Some("Formato válido: 12.345.678-9"));
        assert!(form.error_for(Field::Email).is_some());
        assert!(form.error_for(Field::Telefono).is_none());
        // Focus jumps to the first offending field
        assert_eq!(form.focused(), Field::Nombre);
        assert!(!form.is_sent());
    }

    #[test]
    fn test_focus_wraps() {
        let mut form = ContactForm::default();
        form.focus_prev();
        assert_eq!(form.focused(), Field::Telefono);
        form.focus_next();
        assert_eq!(form.focused(), Field::Nombre);
    }

    #[test]
    fn test_new_selection_resets_card() {
        let a = parcel("lote_1", json!({}));
        let b = parcel("lote_2", json!({}));
        let mut presenter = DetailPresenter::default();

        presenter.sync(Some(&a));
        presenter.switch_tab();
        presenter.form_mut().input('x');
        presenter.sync(Some(&a));
        assert_eq!(presenter.tab(), DetailTab::Contact);

        presenter.sync(Some(&b));
        let card = presenter.card(Some(&b)).unwrap();
        assert_eq!(card.tab, DetailTab::Info);
        assert_eq!(card.form.value(Field::Nombre), "");
        assert_eq!(card.info.title, "Lote 2");
    }

    #[test]
    fn test_submit_without_selection() {
        let mut presenter = DetailPresenter::default();
        assert!(presenter.submit().is_none());
    }
}
