//! ScheduledTask: definición de disparo periódico de una función. El
//! front-end cron que decide *cuándo* disparar queda fuera; acá vive la
//! definición validada y el rastro del último task creado.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledTaskStatus {
    Active,
    Paused,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    id: Uuid,
    name: String,
    environment_id: Uuid,
    creator: String,
    function_id: Uuid,
    parameters: Value,
    schedule: String,
    status: ScheduledTaskStatus,
    most_recent_task_id: Option<Uuid>,
}

impl ScheduledTask {
    /// La expresión cron se valida al construir; una definición con
    /// schedule inválido nunca llega a existir.
    pub fn new(
        name: &str,
        environment_id: Uuid,
        creator: &str,
        function_id: Uuid,
        parameters: Value,
        schedule: &str,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::Validation("scheduled task sin nombre".to_string()));
        }
        if !parameters.is_object() {
            return Err(DomainError::Validation(
                "los parámetros de un scheduled task deben ser un objeto JSON".to_string(),
            ));
        }
        if Schedule::from_str(schedule).is_err() {
            return Err(DomainError::InvalidSchedule(schedule.to_string()));
        }
        Ok(ScheduledTask {
            id: Uuid::new_v4(),
            name: name.to_string(),
            environment_id,
            creator: creator.to_string(),
            function_id,
            parameters,
            schedule: schedule.to_string(),
            status: ScheduledTaskStatus::Active,
            most_recent_task_id: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn environment_id(&self) -> Uuid {
        self.environment_id
    }
    pub fn creator(&self) -> &str {
        &self.creator
    }
    pub fn function_id(&self) -> Uuid {
        self.function_id
    }
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }
    pub fn schedule(&self) -> &str {
        &self.schedule
    }
    pub fn status(&self) -> ScheduledTaskStatus {
        self.status
    }
    pub fn most_recent_task_id(&self) -> Option<Uuid> {
        self.most_recent_task_id
    }

    pub fn activate(&mut self) {
        self.status = ScheduledTaskStatus::Active;
    }
    pub fn pause(&mut self) {
        self.status = ScheduledTaskStatus::Paused;
    }
    pub fn set_error(&mut self) {
        self.status = ScheduledTaskStatus::Error;
    }

    pub fn update_most_recent_task(&mut self, task_id: Uuid) {
        self.most_recent_task_id = Some(task_id);
    }

    /// Próximo disparo estrictamente posterior a `after`, según la
    /// expresión cron ya validada.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, DomainError> {
        let schedule = Schedule::from_str(&self.schedule)
            .map_err(|_| DomainError::InvalidSchedule(self.schedule.clone()))?;
        Ok(schedule.after(&after).next())
    }
}

#[cfg(test)]
mod tests {
    use super::{ScheduledTask, ScheduledTaskStatus};
    use crate::DomainError;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn hourly() -> ScheduledTask {
        ScheduledTask::new(
            "hourly-report",
            Uuid::new_v4(),
            "admin",
            Uuid::new_v4(),
            json!({}),
            "0 0 * * * *",
        )
        .unwrap()
    }

    #[test]
    fn invalid_cron_expression_is_rejected() {
        let r = ScheduledTask::new(
            "broken",
            Uuid::new_v4(),
            "admin",
            Uuid::new_v4(),
            json!({}),
            "every tuesday",
        );
        assert!(matches!(r, Err(DomainError::InvalidSchedule(_))));
    }

    #[test]
    fn next_fire_lands_on_the_hour() {
        let st = hourly();
        let after = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let next = st.next_fire_after(after).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn status_moves_through_helpers() {
        let mut st = hourly();
        assert_eq!(st.status(), ScheduledTaskStatus::Active);
        st.pause();
        assert_eq!(st.status(), ScheduledTaskStatus::Paused);
        st.set_error();
        assert_eq!(st.status(), ScheduledTaskStatus::Error);
        st.activate();
        assert_eq!(st.status(), ScheduledTaskStatus::Active);
        let id = Uuid::new_v4();
        st.update_most_recent_task(id);
        assert_eq!(st.most_recent_task_id(), Some(id));
    }
}
