//! Built-in sample schemas.

use super::{ColumnSpec, SchemaDescriptor, TableSpec};

fn table(name: &str, description: &str, columns: &[(&str, &str)]) -> TableSpec {
    TableSpec {
        name: name.to_string(),
        description: description.to_string(),
        columns: columns
            .iter()
            .map(|(name, attributes)| ColumnSpec::new(name, attributes))
            .collect(),
    }
}

pub(super) fn schemas() -> Vec<SchemaDescriptor> {
    vec![ecommerce(), hospital(), school()]
}

fn ecommerce() -> SchemaDescriptor {
    SchemaDescriptor {
        key: "ecommerce".to_string(),
        name: "E-Commerce".to_string(),
        description: "An e-commerce database for online shopping".to_string(),
        tables: vec![
            table(
                "customers",
                "Stores customer information",
                &[
                    ("customer_id", "INT, PRIMARY KEY"),
                    ("first_name", "VARCHAR(50)"),
                    ("last_name", "VARCHAR(50)"),
                    ("email", "VARCHAR(100), UNIQUE"),
                    ("phone", "VARCHAR(20)"),
                    ("created_at", "TIMESTAMP"),
                    ("city", "VARCHAR(50)"),
                    ("country", "VARCHAR(50)"),
                ],
            ),
            table(
                "products",
                "Stores product information",
                &[
                    ("product_id", "INT, PRIMARY KEY"),
                    ("product_name", "VARCHAR(200)"),
                    ("category", "VARCHAR(50)"),
                    ("price", "DECIMAL(10,2)"),
                    ("stock_quantity", "INT"),
                    ("description", "TEXT"),
                    ("created_at", "TIMESTAMP"),
                ],
            ),
            table(
                "orders",
                "Stores order information",
                &[
                    ("order_id", "INT, PRIMARY KEY"),
                    ("customer_id", "INT, FOREIGN KEY references customers"),
                    ("order_date", "TIMESTAMP"),
                    ("total_amount", "DECIMAL(10,2)"),
                    ("status", "VARCHAR(20)"),
                    ("shipping_address", "TEXT"),
                ],
            ),
            table(
                "order_items",
                "Stores individual items in each order",
                &[
                    ("order_item_id", "INT, PRIMARY KEY"),
                    ("order_id", "INT, FOREIGN KEY references orders"),
                    ("product_id", "INT, FOREIGN KEY references products"),
                    ("quantity", "INT"),
                    ("unit_price", "DECIMAL(10,2)"),
                    ("subtotal", "DECIMAL(10,2)"),
                ],
            ),
        ],
    }
}

fn hospital() -> SchemaDescriptor {
    SchemaDescriptor {
        key: "hospital".to_string(),
        name: "Hospital Management".to_string(),
        description: "A hospital management database".to_string(),
        tables: vec![
            table(
                "patients",
                "Stores patient information",
                &[
                    ("patient_id", "INT, PRIMARY KEY"),
                    ("first_name", "VARCHAR(50)"),
                    ("last_name", "VARCHAR(50)"),
                    ("date_of_birth", "DATE"),
                    ("gender", "VARCHAR(10)"),
                    ("phone", "VARCHAR(20)"),
                    ("email", "VARCHAR(100)"),
                    ("address", "TEXT"),
                    ("blood_type", "VARCHAR(5)"),
                ],
            ),
            table(
                "doctors",
                "Stores doctor information",
                &[
                    ("doctor_id", "INT, PRIMARY KEY"),
                    ("first_name", "VARCHAR(50)"),
                    ("last_name", "VARCHAR(50)"),
                    ("specialization", "VARCHAR(100)"),
                    ("phone", "VARCHAR(20)"),
                    ("email", "VARCHAR(100)"),
                    ("hire_date", "DATE"),
                    ("salary", "DECIMAL(10,2)"),
                ],
            ),
            table(
                "appointments",
                "Stores appointment information",
                &[
                    ("appointment_id", "INT, PRIMARY KEY"),
                    ("patient_id", "INT, FOREIGN KEY references patients"),
                    ("doctor_id", "INT, FOREIGN KEY references doctors"),
                    ("appointment_date", "DATETIME"),
                    ("reason", "TEXT"),
                    ("status", "VARCHAR(20)"),
                    ("notes", "TEXT"),
                ],
            ),
            table(
                "prescriptions",
                "Stores prescription information",
                &[
                    ("prescription_id", "INT, PRIMARY KEY"),
                    ("patient_id", "INT, FOREIGN KEY references patients"),
                    ("doctor_id", "INT, FOREIGN KEY references doctors"),
                    ("medication_name", "VARCHAR(200)"),
                    ("dosage", "VARCHAR(100)"),
                    ("frequency", "VARCHAR(100)"),
                    ("start_date", "DATE"),
                    ("end_date", "DATE"),
                ],
            ),
            table(
                "departments",
                "Stores hospital department information",
                &[
                    ("department_id", "INT, PRIMARY KEY"),
                    ("department_name", "VARCHAR(100)"),
                    ("location", "VARCHAR(100)"),
                    ("phone", "VARCHAR(20)"),
                    ("head_doctor_id", "INT, FOREIGN KEY references doctors"),
                ],
            ),
        ],
    }
}

fn school() -> SchemaDescriptor {
    SchemaDescriptor {
        key: "school".to_string(),
        name: "School Management".to_string(),
        description: "A school management database".to_string(),
        tables: vec![
            table(
                "students",
                "Stores student information",
                &[
                    ("student_id", "INT, PRIMARY KEY"),
                    ("first_name", "VARCHAR(50)"),
                    ("last_name", "VARCHAR(50)"),
                    ("date_of_birth", "DATE"),
                    ("grade_level", "INT"),
                    ("enrollment_date", "DATE"),
                    ("email", "VARCHAR(100)"),
                    ("phone", "VARCHAR(20)"),
                ],
            ),
            table(
                "teachers",
                "Stores teacher information",
                &[
                    ("teacher_id", "INT, PRIMARY KEY"),
                    ("first_name", "VARCHAR(50)"),
                    ("last_name", "VARCHAR(50)"),
                    ("email", "VARCHAR(100)"),
                    ("phone", "VARCHAR(20)"),
                    ("hire_date", "DATE"),
                    ("subject_specialization", "VARCHAR(100)"),
                ],
            ),
            table(
                "courses",
                "Stores course information",
                &[
                    ("course_id", "INT, PRIMARY KEY"),
                    ("course_name", "VARCHAR(100)"),
                    ("course_code", "VARCHAR(20)"),
                    ("credits", "INT"),
                    ("teacher_id", "INT, FOREIGN KEY references teachers"),
                    ("semester", "VARCHAR(20)"),
                    ("year", "INT"),
                ],
            ),
            table(
                "enrollments",
                "Stores student course enrollments",
                &[
                    ("enrollment_id", "INT, PRIMARY KEY"),
                    ("student_id", "INT, FOREIGN KEY references students"),
                    ("course_id", "INT, FOREIGN KEY references courses"),
                    ("enrollment_date", "DATE"),
                    ("grade", "VARCHAR(2)"),
                    ("status", "VARCHAR(20)"),
                ],
            ),
            table(
                "grades",
                "Stores student grades",
                &[
                    ("grade_id", "INT, PRIMARY KEY"),
                    ("enrollment_id", "INT, FOREIGN KEY references enrollments"),
                    ("assignment_name", "VARCHAR(100)"),
                    ("grade_value", "DECIMAL(5,2)"),
                    ("max_points", "DECIMAL(5,2)"),
                    ("grade_date", "DATE"),
                ],
            ),
        ],
    }
}
