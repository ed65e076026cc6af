// src/services/employee_service.rs

use sqlx::PgPool;

use crate::{
    common::{
        db_utils::Assignments,
        error::AppError,
        pagination::non_blank,
    },
    db::{EmployeeRepository, UserRepository},
    models::{
        employee::{parse_form_date, CreateEmployeePayload, Employee, EmployeeCreated, UpdateEmployeePayload},
        user::AddressType,
    },
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct EmployeeService {
    user_repo: UserRepository,
    employee_repo: EmployeeRepository,
    pool: PgPool,
}

impl EmployeeService {
    pub fn new(user_repo: UserRepository, employee_repo: EmployeeRepository, pool: PgPool) -> Self {
        Self {
            user_repo,
            employee_repo,
            pool,
        }
    }

    /// Creates the user, its optional address / bank rows and the employee
    /// record in one transaction. Nothing is left behind on failure.
    /// The payload must already be validated.
    pub async fn create_employee_as_user(
        &self,
        payload: CreateEmployeePayload,
    ) -> Result<EmployeeCreated, AppError> {
        // 1. Everything that can fail without the database, before the transaction
        let joining_date = parse_form_date("joining_date", payload.joining_date.as_deref())?;
        let date_of_birth = parse_form_date("date_of_birth", payload.date_of_birth.as_deref())?;
        let password_hash = hash_password(payload.password.clone()).await?;

        let mut user_fields = Assignments::new();
        user_fields
            .set("first_name", payload.first_name.trim())
            .set("last_name", payload.last_name.trim())
            .set("email", payload.email.trim().to_lowercase())
            .set("mobile", payload.mobile.trim())
            .set("password_hash", password_hash);
        payload.roles.apply(&mut user_fields);
        // employees are always flagged as such, whatever the form said
        user_fields.set("is_employee", true);

        let mut employee_fields = Assignments::new();
        employee_fields
            .set_opt("department_id", payload.department_id)
            .set_opt("designation_id", payload.designation_id)
            .set_opt("employee_code", non_blank(payload.employee_code.as_deref()))
            .set_opt("joining_date", joining_date)
            .set_opt("date_of_birth", date_of_birth)
            .set_opt("salary", payload.salary);

        // 2. The transaction
        let mut tx = self.pool.begin().await?;

        let user = self.user_repo.create_user(&mut *tx, user_fields).await?;

        let mut addresses = Vec::new();
        let blocks = [
            (AddressType::Permanent, payload.permanent_address.as_ref()),
            (AddressType::Residential, payload.residential_address.as_ref()),
        ];
        for (address_type, block) in blocks {
            if let Some(block) = block.filter(|b| !b.is_blank()) {
                let address = self
                    .user_repo
                    .create_address(&mut *tx, user.id, address_type, block)
                    .await?;
                addresses.push(address);
            }
        }

        let mut bank_accounts = Vec::new();
        if let Some(bank) = payload.bank_account.as_ref().filter(|b| !b.is_blank()) {
            let account = self
                .user_repo
                .create_bank_account(&mut *tx, user.id, bank, true)
                .await?;
            bank_accounts.push(account);
        }

        let employee = self
            .employee_repo
            .create(&mut *tx, user.id, employee_fields)
            .await?;

        // 3. Commit; dropping `tx` on any `?` above rolls everything back
        tx.commit().await?;

        tracing::info!(user_id = user.id, employee_id = employee.id, "✅ Employee created");

        Ok(EmployeeCreated {
            user,
            employee,
            addresses,
            bank_accounts,
        })
    }

    /// Updates the employee record and the user fields it exposes.
    pub async fn update_employee(
        &self,
        id: i64,
        payload: UpdateEmployeePayload,
    ) -> Result<Employee, AppError> {
        let joining_date = parse_form_date("joining_date", payload.joining_date.as_deref())?;
        let date_of_birth = parse_form_date("date_of_birth", payload.date_of_birth.as_deref())?;

        let mut employee_fields = Assignments::new();
        employee_fields
            .set_opt("department_id", payload.department_id)
            .set_opt("designation_id", payload.designation_id)
            .set_opt("employee_code", payload.employee_code)
            .set_opt("joining_date", joining_date)
            .set_opt("date_of_birth", date_of_birth)
            .set_opt("salary", payload.salary);

        let mut user_fields = Assignments::new();
        user_fields
            .set_opt("first_name", payload.first_name)
            .set_opt("last_name", payload.last_name)
            .set_opt("mobile", payload.mobile)
            .set_opt("is_active", payload.is_active);

        let mut tx = self.pool.begin().await?;

        let employee = self
            .employee_repo
            .update(&mut *tx, id, employee_fields)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?;

        if !user_fields.is_empty() {
            self.user_repo
                .update_user(&mut *tx, employee.user_id, user_fields)
                .await?;
        }

        tx.commit().await?;
        Ok(employee)
    }

    /// Drops the employee record and clears the user's employee flag.
    pub async fn delete_employee(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let employee = self
            .employee_repo
            .delete(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))?;

        let mut flag = Assignments::new();
        flag.set("is_employee", false);
        self.user_repo
            .update_user(&mut *tx, employee.user_id, flag)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
