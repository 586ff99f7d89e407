//! Almacén PostgreSQL
//!
//! Consultas sqlx en tiempo de ejecución sobre el schema de
//! `migrations/0001_schema.sql`. Reservar, mover y aprobar bloquean la fila del
//! profesor (`FOR UPDATE`) para que dos peticiones simultáneas del mismo
//! profesor se serialicen; el índice único parcial de clases aprobadas queda
//! como respaldo.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{
    approval_competes, approval_conflict_message, AppointmentOwner, OverlapGuard, ScheduleStore,
};
use crate::models::{
    Appointment, AppointmentChanges, NewAppointment, NewWorkHours, Place, Student, Teacher,
    WorkHours, WorkHoursTarget,
};
use crate::utils::errors::{not_found_error, slot_unavailable, AppError, AppResult};
use crate::utils::filters::{AppointmentListFilter, Show};

pub struct PgScheduleStore {
    pool: PgPool,
}

impl PgScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_teacher(tx: &mut Transaction<'_, Postgres>, teacher_id: Uuid) -> AppResult<()> {
        sqlx::query("SELECT id FROM teachers WHERE id = $1 FOR UPDATE")
            .bind(teacher_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found_error("Teacher", &teacher_id.to_string()))?;
        Ok(())
    }

    async fn displace(tx: &mut Transaction<'_, Postgres>, teacher_id: Uuid, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE appointments SET deleted = TRUE WHERE id = ANY($1) AND teacher_id = $2")
            .bind(ids)
            .bind(teacher_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// ¿Alguna cita del profesor que `guard` considera bloqueante pisa `[start, end)`?
    async fn has_overlap(
        tx: &mut Transaction<'_, Postgres>,
        teacher_id: Uuid,
        (start, end): (NaiveDateTime, NaiveDateTime),
        guard: OverlapGuard,
        except: Option<Uuid>,
    ) -> AppResult<bool> {
        let overlap_query = format!(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE teacher_id = $1 AND {}
                  AND ($4::uuid IS NULL OR id <> $4)
                  AND date < $3
                  AND date + make_interval(mins => duration) > $2
            )
            "#,
            guard.sql_condition()
        );
        let (clash,): (bool,) = sqlx::query_as(&overlap_query)
            .bind(teacher_id)
            .bind(start)
            .bind(end)
            .bind(except)
            .fetch_one(&mut **tx)
            .await?;
        Ok(clash)
    }
}

const UPDATE_APPOINTMENT: &str = r#"
    UPDATE appointments
    SET date = COALESCE($2, date),
        duration = COALESCE($3, duration),
        price = COALESCE($4, price),
        comments = COALESCE($5, comments),
        meetup_place_id = COALESCE($6, meetup_place_id),
        dropoff_place_id = COALESCE($7, dropoff_place_id),
        is_approved = COALESCE($8, is_approved),
        type = COALESCE($9, type)
    WHERE id = $1
    RETURNING *
"#;

async fn apply_changes<'e, E>(
    executor: E,
    id: Uuid,
    changes: &AppointmentChanges,
) -> Result<Option<Appointment>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Appointment>(UPDATE_APPOINTMENT)
        .bind(id)
        .bind(changes.date)
        .bind(changes.duration)
        .bind(changes.price)
        .bind(&changes.comments)
        .bind(changes.meetup_place_id)
        .bind(changes.dropoff_place_id)
        .bind(changes.is_approved)
        .bind(changes.kind)
        .fetch_optional(executor)
        .await
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

#[async_trait]
impl ScheduleStore for PgScheduleStore {
    async fn find_teacher(&self, id: Uuid) -> AppResult<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(teacher)
    }

    async fn find_student(&self, id: Uuid) -> AppResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    async fn find_place(&self, id: Uuid) -> AppResult<Option<Place>> {
        let place = sqlx::query_as::<_, Place>("SELECT * FROM places WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(place)
    }

    async fn work_hours_on_date(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<WorkHours>> {
        let hours = sqlx::query_as::<_, WorkHours>(
            r#"
            SELECT * FROM work_hours
            WHERE teacher_id = $1 AND on_date = $2
            ORDER BY from_hour, from_minutes
            "#,
        )
        .bind(teacher_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(hours)
    }

    async fn work_hours_on_weekday(&self, teacher_id: Uuid, day: i32) -> AppResult<Vec<WorkHours>> {
        let hours = sqlx::query_as::<_, WorkHours>(
            r#"
            SELECT * FROM work_hours
            WHERE teacher_id = $1 AND on_date IS NULL AND day = $2
            ORDER BY from_hour, from_minutes
            "#,
        )
        .bind(teacher_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(hours)
    }

    async fn list_work_hours(&self, teacher_id: Uuid) -> AppResult<Vec<WorkHours>> {
        let hours = sqlx::query_as::<_, WorkHours>(
            r#"
            SELECT * FROM work_hours
            WHERE teacher_id = $1
            ORDER BY on_date NULLS FIRST, day, from_hour, from_minutes
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(hours)
    }

    async fn replace_work_hours(
        &self,
        teacher_id: Uuid,
        target: WorkHoursTarget,
        entries: Vec<NewWorkHours>,
    ) -> AppResult<Vec<WorkHours>> {
        let mut tx = self.pool.begin().await?;

        match target {
            WorkHoursTarget::Weekday(day) => {
                sqlx::query("DELETE FROM work_hours WHERE teacher_id = $1 AND on_date IS NULL AND day = $2")
                    .bind(teacher_id)
                    .bind(day)
                    .execute(&mut *tx)
                    .await?;
            }
            WorkHoursTarget::Date(date) => {
                sqlx::query("DELETE FROM work_hours WHERE teacher_id = $1 AND on_date = $2")
                    .bind(teacher_id)
                    .bind(date)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let mut created = Vec::with_capacity(entries.len());
        for new in entries {
            let entry = WorkHours::from_new(teacher_id, target, new);
            let row = sqlx::query_as::<_, WorkHours>(
                r#"
                INSERT INTO work_hours (
                    id, teacher_id, day, on_date, from_hour, from_minutes,
                    to_hour, to_minutes, car_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(entry.id)
            .bind(entry.teacher_id)
            .bind(entry.day)
            .bind(entry.on_date)
            .bind(entry.from_hour)
            .bind(entry.from_minutes)
            .bind(entry.to_hour)
            .bind(entry.to_minutes)
            .bind(entry.car_id)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn delete_work_hours(&self, teacher_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM work_hours WHERE id = $1 AND teacher_id = $2")
            .bind(id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn appointments_on_date(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<Appointment>> {
        let (from, to) = day_bounds(date);
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE teacher_id = $1 AND NOT deleted AND date >= $2 AND date < $3
            ORDER BY date
            "#,
        )
        .bind(teacher_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn find_appointment(&self, id: Uuid) -> AppResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(appointment)
    }

    async fn count_student_appointments_between(
        &self,
        student_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE student_id = $1 AND NOT deleted AND date >= $2 AND date < $3
            "#,
        )
        .bind(student_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_approved_lessons_before(&self, student_id: Uuid, before: NaiveDateTime) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE student_id = $1 AND is_approved AND NOT deleted
              AND type = 'lesson' AND date < $2
            "#,
        )
        .bind(student_id)
        .bind(before)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_appointment(
        &self,
        new: NewAppointment,
        displace: &[Uuid],
        guard: OverlapGuard,
    ) -> AppResult<Appointment> {
        let mut tx = self.pool.begin().await?;
        Self::lock_teacher(&mut tx, new.teacher_id).await?;
        Self::displace(&mut tx, new.teacher_id, displace).await?;

        let end = new.date + Duration::minutes(new.duration as i64);
        if Self::has_overlap(&mut tx, new.teacher_id, (new.date, end), guard, None).await? {
            // el drop de `tx` deshace también los desplazamientos
            return Err(slot_unavailable());
        }

        let appointment = new.into_appointment(Utc::now().naive_utc());
        let inserted = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                id, teacher_id, student_id, creator_id, date, duration, is_approved,
                deleted, type, price, comments, meetup_place_id, dropoff_place_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.teacher_id)
        .bind(appointment.student_id)
        .bind(appointment.creator_id)
        .bind(appointment.date)
        .bind(appointment.duration)
        .bind(appointment.is_approved)
        .bind(appointment.deleted)
        .bind(appointment.kind)
        .bind(appointment.price)
        .bind(&appointment.comments)
        .bind(appointment.meetup_place_id)
        .bind(appointment.dropoff_place_id)
        .bind(appointment.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                slot_unavailable()
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_appointment(&self, id: Uuid, changes: &AppointmentChanges) -> AppResult<Appointment> {
        let updated = apply_changes(&self.pool, id, changes)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::ConflictDuringApproval("Another approved lesson already starts at that time".to_string())
                } else {
                    AppError::Database(e)
                }
            })?
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;
        Ok(updated)
    }

    async fn reschedule_appointment(
        &self,
        id: Uuid,
        changes: &AppointmentChanges,
        displace: &[Uuid],
        guard: OverlapGuard,
    ) -> AppResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let mut moved = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;

        Self::lock_teacher(&mut tx, moved.teacher_id).await?;
        let displace: Vec<Uuid> = displace.iter().copied().filter(|d| *d != id).collect();
        Self::displace(&mut tx, moved.teacher_id, &displace).await?;

        changes.apply_to(&mut moved);
        if Self::has_overlap(&mut tx, moved.teacher_id, moved.interval(), guard, Some(id)).await? {
            // el drop de `tx` deshace también los desplazamientos
            return Err(slot_unavailable());
        }

        let updated = apply_changes(&mut *tx, id, changes)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    slot_unavailable()
                } else {
                    AppError::Database(e)
                }
            })?
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn soft_delete_appointments(&self, ids: &[Uuid]) -> AppResult<Vec<Appointment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let deleted = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET deleted = TRUE WHERE id = ANY($1) AND NOT deleted RETURNING *",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(deleted)
    }

    async fn approve_appointment(&self, id: Uuid) -> AppResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;

        Self::lock_teacher(&mut tx, target.teacher_id).await?;

        if approval_competes(&target) {
            let (conflict,): (bool,) = sqlx::query_as(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM appointments
                    WHERE teacher_id = $1 AND date = $2 AND id <> $3
                      AND is_approved AND NOT deleted AND type = 'lesson'
                )
                "#,
            )
            .bind(target.teacher_id)
            .bind(target.date)
            .bind(target.id)
            .fetch_one(&mut *tx)
            .await?;
            if conflict {
                return Err(AppError::ConflictDuringApproval(approval_conflict_message(&target)));
            }
        }

        let approved = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET is_approved = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::ConflictDuringApproval(approval_conflict_message(&target))
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(approved)
    }

    async fn list_appointments(
        &self,
        owner: AppointmentOwner,
        filter: &AppointmentListFilter,
        now: NaiveDateTime,
    ) -> AppResult<Vec<Appointment>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM appointments WHERE ");
        match owner {
            AppointmentOwner::Teacher(id) => {
                query.push("teacher_id = ").push_bind(id);
            }
            AppointmentOwner::Student(id) => {
                query.push("student_id = ").push_bind(id);
            }
        }
        query.push(" AND deleted = ").push_bind(filter.deleted);
        match filter.show {
            Show::Upcoming => {
                query.push(" AND date >= ").push_bind(now);
            }
            Show::History => {
                query.push(" AND date < ").push_bind(now);
            }
        }
        if let Some(student_id) = filter.student_id {
            query.push(" AND student_id = ").push_bind(student_id);
        }
        query.push(" ORDER BY ").push(filter.order.sql());

        let appointments = query
            .build_query_as::<Appointment>()
            .fetch_all(&self.pool)
            .await?;
        Ok(appointments)
    }
}
