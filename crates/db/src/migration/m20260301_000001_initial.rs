//! Initial database migration.
//!
//! Creates the enums, directory tables, the transaction ledger, daily
//! summaries, the policy singleton, and the audit log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: DIRECTORY
        // ============================================================
        db.execute_unprepared(PARTIES_SQL).await?;
        db.execute_unprepared(BRANCHES_SQL).await?;
        db.execute_unprepared(STAFF_BRANCHES_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(RATE_POLICIES_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(DAILY_SUMMARIES_SQL).await?;

        // ============================================================
        // PART 4: AUDIT
        // ============================================================
        db.execute_unprepared(AUDIT_LOGS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Party roles
CREATE TYPE party_role AS ENUM ('client', 'staff', 'admin');

-- Transaction status
CREATE TYPE transaction_status AS ENUM ('pending', 'completed', 'failed');
";

const PARTIES_SQL: &str = r"
CREATE TABLE parties (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    phone VARCHAR(32),
    role party_role NOT NULL,
    balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_parties_role ON parties(role) WHERE is_active;
";

const BRANCHES_SQL: &str = r"
CREATE TABLE branches (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    code VARCHAR(32) NOT NULL UNIQUE,
    client_id UUID NOT NULL REFERENCES parties(id),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_branch_code_upper CHECK (code = upper(code))
);

CREATE INDEX idx_branches_client ON branches(client_id);
";

const STAFF_BRANCHES_SQL: &str = r"
CREATE TABLE staff_branches (
    staff_id UUID NOT NULL REFERENCES parties(id) ON DELETE CASCADE,
    branch_id UUID NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (staff_id, branch_id)
);

CREATE INDEX idx_staff_branches_branch ON staff_branches(branch_id);
";

const RATE_POLICIES_SQL: &str = r"
CREATE TABLE rate_policies (
    id INTEGER PRIMARY KEY DEFAULT 1,
    commission_rate NUMERIC(5, 2) NOT NULL,
    deposit_deduction_rate NUMERIC(5, 2) NOT NULL,
    updated_by UUID REFERENCES parties(id),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_policy_singleton CHECK (id = 1),
    CONSTRAINT chk_commission_rate CHECK (commission_rate BETWEEN 0 AND 100),
    CONSTRAINT chk_deposit_deduction_rate CHECK (deposit_deduction_rate BETWEEN 0 AND 100)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    client_id UUID NOT NULL REFERENCES parties(id),
    staff_id UUID NOT NULL REFERENCES parties(id),
    branch_id UUID NOT NULL REFERENCES branches(id),
    kind VARCHAR(16) NOT NULL,
    amount NUMERIC(20, 2) NOT NULL,
    commission NUMERIC(20, 2) NOT NULL,
    final_amount NUMERIC(20, 2) NOT NULL,
    remark TEXT NOT NULL DEFAULT '',
    utr_id VARCHAR(22) NOT NULL,
    balance_before NUMERIC(20, 2) NOT NULL,
    balance_after NUMERIC(20, 2) NOT NULL,
    status transaction_status NOT NULL DEFAULT 'completed',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_transactions_utr UNIQUE (utr_id),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_commission_non_negative CHECK (commission >= 0),
    CONSTRAINT chk_final_amount CHECK (final_amount = amount - commission)
);

CREATE INDEX idx_txn_staff_created ON transactions(staff_id, created_at DESC);
CREATE INDEX idx_txn_client_created ON transactions(client_id, created_at DESC);
CREATE INDEX idx_txn_branch_created ON transactions(branch_id, created_at DESC);
CREATE INDEX idx_txn_completed_created ON transactions(created_at) WHERE status = 'completed';
";

const DAILY_SUMMARIES_SQL: &str = r"
CREATE TABLE daily_summaries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    date DATE NOT NULL,
    party_id UUID NOT NULL REFERENCES parties(id),
    role party_role NOT NULL,
    branch_id UUID NOT NULL REFERENCES branches(id),
    total_credit NUMERIC(20, 2) NOT NULL DEFAULT 0,
    total_debit NUMERIC(20, 2) NOT NULL DEFAULT 0,
    total_commission NUMERIC(20, 2) NOT NULL DEFAULT 0,
    transaction_count BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_daily_summary_key UNIQUE (date, party_id, branch_id)
);

CREATE INDEX idx_daily_summaries_date ON daily_summaries(date);
";

const AUDIT_LOGS_SQL: &str = r"
CREATE TABLE audit_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    actor_id UUID NOT NULL,
    action VARCHAR(64) NOT NULL,
    resource_type VARCHAR(32) NOT NULL,
    resource_id UUID,
    details JSONB NOT NULL DEFAULT '{}'::jsonb,
    ip_address VARCHAR(45),
    user_agent TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audit_logs_actor ON audit_logs(actor_id, created_at DESC);
CREATE INDEX idx_audit_logs_resource ON audit_logs(resource_type, resource_id);
";

const TRIGGERS_SQL: &str = r"
-- Transactions and daily summaries are insert-only.
CREATE OR REPLACE FUNCTION reject_update()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% rows are immutable', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_immutable
    BEFORE UPDATE ON transactions
    FOR EACH ROW EXECUTE FUNCTION reject_update();

CREATE TRIGGER trg_daily_summaries_immutable
    BEFORE UPDATE ON daily_summaries
    FOR EACH ROW EXECUTE FUNCTION reject_update();

CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_parties_updated_at
    BEFORE UPDATE ON parties
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_branches_updated_at
    BEFORE UPDATE ON branches
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS audit_logs CASCADE;
DROP TABLE IF EXISTS daily_summaries CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS rate_policies CASCADE;
DROP TABLE IF EXISTS staff_branches CASCADE;
DROP TABLE IF EXISTS branches CASCADE;
DROP TABLE IF EXISTS parties CASCADE;
DROP FUNCTION IF EXISTS reject_update() CASCADE;
DROP FUNCTION IF EXISTS touch_updated_at() CASCADE;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS party_role;
";
