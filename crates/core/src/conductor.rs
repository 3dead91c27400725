//! Driver ("conductor") record and its create/update payload.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::record::{FieldValue, Registro};
use crate::types::Timestamp;

/// A driver as stored by the remote system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conductor {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub tipo_identificacion: String,
    pub numero_identificacion: String,
    pub telefono: String,
    pub tipo_contrato: String,
    pub activo: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(rename = "deletedAt", default)]
    pub deleted_at: Option<Timestamp>,
}

/// Payload for creating or updating a conductor.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ConductorInput {
    #[validate(length(min = 1, message = "el nombre es obligatorio"))]
    pub nombre: String,
    #[validate(length(min = 1, message = "el apellido es obligatorio"))]
    pub apellido: String,
    #[validate(email(message = "el correo no es válido"))]
    pub correo: String,
    #[validate(length(min = 1, message = "el tipo de identificación es obligatorio"))]
    pub tipo_identificacion: String,
    #[validate(length(min = 5, max = 20, message = "la identificación debe tener entre 5 y 20 caracteres"))]
    pub numero_identificacion: String,
    pub telefono: String,
    #[validate(length(min = 1, message = "el tipo de contrato es obligatorio"))]
    pub tipo_contrato: String,
    pub activo: bool,
}

impl Registro for Conductor {
    const COLLECTION: &'static str = "conductores";
    const ENTITY: &'static str = "conductor";
    const DEFAULT_SORT_KEY: &'static str = "nombre";

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }

    fn search_haystacks(&self) -> Vec<&str> {
        vec![
            &self.nombre,
            &self.apellido,
            &self.correo,
            &self.numero_identificacion,
        ]
    }

    fn sort_value(&self, key: &str) -> Option<FieldValue> {
        match key {
            "nombre" => Some(FieldValue::Text(self.nombre.clone())),
            "apellido" => Some(FieldValue::Text(self.apellido.clone())),
            "correo" => Some(FieldValue::Text(self.correo.clone())),
            "tipo_identificacion" => Some(FieldValue::Text(self.tipo_identificacion.clone())),
            "numero_identificacion" => Some(FieldValue::Text(self.numero_identificacion.clone())),
            "tipo_contrato" => Some(FieldValue::Text(self.tipo_contrato.clone())),
            "activo" => Some(FieldValue::Bool(self.activo)),
            "createdAt" => self.created_at.map(|t| FieldValue::Int(t.timestamp_millis())),
            "updatedAt" => self.updated_at.map(|t| FieldValue::Int(t.timestamp_millis())),
            _ => None,
        }
    }

    fn filter_value(&self, dimension: &str) -> Option<FieldValue> {
        match dimension {
            "tipo_identificacion" => Some(FieldValue::Text(self.tipo_identificacion.clone())),
            "tipo_contrato" => Some(FieldValue::Text(self.tipo_contrato.clone())),
            "activo" => Some(FieldValue::Bool(self.activo)),
            _ => None,
        }
    }

    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }
}
