use specdoc::{extract, flatten, render, restore, unflatten, ApiSpec, FidelityValidator, SpecFormat};

const SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Pet Store
  description: Manage pets
  version: 1.0.0
servers:
  - url: https://api.example.com/v1
    description: Production
tags:
  - name: pets
    description: Pet operations
security:
  - api_key: []
paths:
  /pets:
    get:
      summary: List pets
      operationId: listPets
      tags: [pets]
      security:
        - api_key: [read:pets]
      parameters:
        - name: limit
          in: query
          description: Page size
          schema:
            type: integer
      responses:
        '200':
          description: A list of pets
          headers:
            x-next:
              description: Next page token
              schema:
                type: string
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
        '500':
          description: Unexpected error
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Error'
    post:
      summary: Create a pet
      operationId: createPet
      tags: [pets]
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '201':
          description: Created
  /pets/{petId}:
    get:
      summary: Fetch one pet
      operationId: getPet
      responses:
        '200':
          description: A single pet
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
        name:
          type: string
          description: Display name
        status:
          type: string
          enum: [available, sold]
        labels:
          type: object
          additionalProperties:
            type: string
    Error:
      type: object
      required: [code, message]
      properties:
        code:
          type: integer
        message:
          type: string
"#;

#[test]
fn full_round_trip_scores_one_hundred() {
    let result = FidelityValidator::new().validate(SPEC);
    assert_eq!(result.report, Vec::<String>::new());
    assert_eq!(result.score, 100);
}

#[test]
fn markdown_projection_restores_the_parsed_document() {
    let original = ApiSpec::parse(SPEC).unwrap();
    let restored = restore(&extract(&render(&original)));
    assert_eq!(restored, original);
}

#[test]
fn restored_document_reserializes_and_reparses_identically() {
    let original = ApiSpec::parse(SPEC).unwrap();
    let restored = restore(&extract(&render(&original)));

    let yaml = restored.serialize(SpecFormat::Yaml).unwrap();
    assert_eq!(ApiSpec::parse(&yaml).unwrap(), original);

    let json = restored.serialize(SpecFormat::Json).unwrap();
    assert_eq!(ApiSpec::parse(&json).unwrap(), original);
}

#[test]
fn component_field_tables_rebuild_component_schemas() {
    let spec = ApiSpec::parse(SPEC).unwrap();
    for (name, schema) in spec.components.iter() {
        let rows = flatten(schema, &spec.components);
        assert_eq!(&unflatten(&rows), schema, "component {}", name);
    }
}
