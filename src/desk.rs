use crate::form::{ProductionForm, random_suffix};
use chrono::Utc;
use log::info;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_MAX_FORMS: usize = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeskError {
    #[error("no more than {0} forms can be open at once")]
    DeskFull(usize),
    #[error("the last open form cannot be closed")]
    LastForm,
    #[error("form '{0}' has unsaved data; confirm to close it")]
    ConfirmationRequired(String),
    #[error("no open form with id '{0}'")]
    NoSuchForm(String),
}

/// Tab strip entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTab {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub has_data: bool,
}

/// The production forms an operator has open, one of them active.
#[derive(Clone, Debug)]
pub struct FormDesk {
    forms: Vec<ProductionForm>,
    active: usize,
    max_forms: usize,
}

fn new_form_id() -> String {
    format!("form-{}-{}", Utc::now().timestamp_millis(), random_suffix())
}

impl FormDesk {
    pub fn new(max_forms: usize) -> Self {
        FormDesk {
            forms: vec![ProductionForm::new(new_form_id())],
            active: 0,
            max_forms: max_forms.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn max_forms(&self) -> usize {
        self.max_forms
    }

    pub fn forms(&self) -> &[ProductionForm] {
        &self.forms
    }

    pub fn tabs(&self) -> Vec<FormTab> {
        self.forms
            .iter()
            .enumerate()
            .map(|(i, form)| FormTab {
                id: form.id.clone(),
                name: form.display_name(i),
                active: i == self.active,
                has_data: form.has_data(),
            })
            .collect()
    }

    fn position(&self, id: &str) -> Result<usize, DeskError> {
        self.forms
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| DeskError::NoSuchForm(id.to_string()))
    }

    /// Tab caption of the form with `id`.
    pub fn name_of(&self, id: &str) -> Result<String, DeskError> {
        let pos = self.position(id)?;
        Ok(self.forms[pos].display_name(pos))
    }

    pub fn get(&self, id: &str) -> Result<&ProductionForm, DeskError> {
        let pos = self.position(id)?;
        Ok(&self.forms[pos])
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut ProductionForm, DeskError> {
        let pos = self.position(id)?;
        Ok(&mut self.forms[pos])
    }

    pub fn active(&self) -> &ProductionForm {
        &self.forms[self.active]
    }

    pub fn active_mut(&mut self) -> &mut ProductionForm {
        &mut self.forms[self.active]
    }

    /// Open a new blank form and make it active. Returns its id.
    pub fn open(&mut self) -> Result<String, DeskError> {
        self.insert(ProductionForm::new(new_form_id()))
    }

    /// Open an existing form (for example a loaded draft) and make it active.
    pub fn insert(&mut self, form: ProductionForm) -> Result<String, DeskError> {
        if self.forms.len() >= self.max_forms {
            return Err(DeskError::DeskFull(self.max_forms));
        }
        let id = form.id.clone();
        self.forms.push(form);
        self.active = self.forms.len() - 1;
        info!("opened form {} ({} open)", id, self.forms.len());
        Ok(id)
    }

    pub fn activate(&mut self, id: &str) -> Result<(), DeskError> {
        self.active = self.position(id)?;
        Ok(())
    }

    /// Close a form. A form with data needs `confirmed`.
    pub fn close(&mut self, id: &str, confirmed: bool) -> Result<ProductionForm, DeskError> {
        let pos = self.position(id)?;
        if self.forms.len() <= 1 {
            return Err(DeskError::LastForm);
        }
        if self.forms[pos].has_data() && !confirmed {
            return Err(DeskError::ConfirmationRequired(id.to_string()));
        }

        let removed = self.forms.remove(pos);
        if self.active > pos || self.active >= self.forms.len() {
            self.active = self.active.saturating_sub(1).min(self.forms.len() - 1);
        }
        info!("closed form {} ({} open)", removed.id, self.forms.len());
        Ok(removed)
    }
}

impl Default for FormDesk {
    fn default() -> Self {
        FormDesk::new(DEFAULT_MAX_FORMS)
    }
}
