//! Schema bootstrap DDL.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id SERIAL PRIMARY KEY,
    file_path TEXT UNIQUE NOT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS enhancements (
    id SERIAL PRIMARY KEY,
    document_id INT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    enhancement_type TEXT NOT NULL,
    content JSONB NOT NULL,
    robot_id TEXT NOT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    UNIQUE (document_id, enhancement_type, robot_id)
);
CREATE INDEX IF NOT EXISTS idx_enhancements_document_id ON enhancements (document_id);
CREATE INDEX IF NOT EXISTS idx_enhancements_type ON enhancements (enhancement_type);

CREATE TABLE IF NOT EXISTS pending_enhancements (
    id SERIAL PRIMARY KEY,
    document_id INT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    enhancement_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW(),
    attempts INT DEFAULT 0,
    last_error TEXT,
    UNIQUE (document_id, enhancement_type)
);
CREATE INDEX IF NOT EXISTS idx_pending_enhancements_status ON pending_enhancements (status);
CREATE INDEX IF NOT EXISTS idx_pending_enhancements_type ON pending_enhancements (enhancement_type);
";
